use anyhow::{Context, Result};
use dotenvy::dotenv;
use geocode::providers::nominatim;
use geocode::{ApiKey, ProviderConfig, ProviderKind};
use std::env;

/// Default cache location, created on first use.
pub const DEFAULT_CACHE_URL: &str = "sqlite://mapmark-cache.db?mode=rwc";

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub google_api_key: Option<ApiKey>,
    pub nominatim_base_url: Option<String>,
    pub user_agent: Option<String>,
    pub contact_email: Option<String>,
    pub cache_url: String,
    pub area_hint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Nominatim,
            google_api_key: None,
            nominatim_base_url: None,
            user_agent: None,
            contact_email: None,
            cache_url: DEFAULT_CACHE_URL.to_string(),
            area_hint: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        let _ = dotenv();

        let provider = match optional("MAPMARK_PROVIDER") {
            Some(name) => name
                .parse()
                .context("MAPMARK_PROVIDER must be nominatim or google")?,
            None => ProviderKind::Nominatim,
        };

        Ok(Self {
            provider,
            google_api_key: optional("GOOGLE_GEOCODING_API_KEY").and_then(|raw| ApiKey::parse(&raw)),
            nominatim_base_url: optional("NOMINATIM_BASE_URL"),
            user_agent: optional("MAPMARK_USER_AGENT"),
            contact_email: optional("MAPMARK_CONTACT_EMAIL"),
            cache_url: optional("MAPMARK_CACHE_URL").unwrap_or_else(|| DEFAULT_CACHE_URL.to_string()),
            area_hint: optional("MAPMARK_AREA_HINT"),
        })
    }

    /// Provider settings for `kind`, filled in from the environment.
    pub fn provider_config(&self, kind: ProviderKind) -> ProviderConfig {
        match kind {
            ProviderKind::Nominatim => ProviderConfig::Nominatim {
                base_url: self
                    .nominatim_base_url
                    .clone()
                    .unwrap_or_else(|| nominatim::DEFAULT_BASE_URL.to_string()),
                user_agent: self
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| nominatim::DEFAULT_USER_AGENT.to_string()),
                email: self.contact_email.clone(),
            },
            ProviderKind::Google => ProviderConfig::google(self.google_api_key.clone()),
        }
    }
}

/// Unset and blank variables both read as `None`.
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominatim_settings_fall_back_to_defaults() {
        let config = Config {
            contact_email: Some("maps@example.org".to_string()),
            ..Config::default()
        };

        match config.provider_config(ProviderKind::Nominatim) {
            ProviderConfig::Nominatim {
                base_url,
                user_agent,
                email,
            } => {
                assert_eq!(base_url, nominatim::DEFAULT_BASE_URL);
                assert!(user_agent.starts_with("mapmark/"));
                assert_eq!(email.as_deref(), Some("maps@example.org"));
            }
            other => panic!("expected nominatim, got {:?}", other),
        }
    }

    #[test]
    fn test_google_settings_carry_the_key() {
        let config = Config {
            google_api_key: Some(ApiKey::from("k-123")),
            ..Config::default()
        };

        let provider = config.provider_config(ProviderKind::Google);
        assert_eq!(provider.kind(), ProviderKind::Google);
        assert!(!format!("{:?}", provider).contains("k-123"));
    }
}
