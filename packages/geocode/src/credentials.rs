//! Provider API keys, held as [`SecretString`] so they stay out of logs.

use secrecy::{ExposeSecret, SecretString};

/// A geocoding provider key. Surrounding whitespace is dropped on construction.
#[derive(Clone, Debug)]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(SecretString::from(value.as_ref().trim().to_string()))
    }

    /// A key from raw configuration text; `None` when blank.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = Self::new(raw);
        (!key.is_blank()).then_some(key)
    }

    /// Read the key. Only call this when building a request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Providers treat a blank key as missing.
    pub fn is_blank(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_never_appears_in_debug() {
        let key = ApiKey::new("AIzaSy-very-secret");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(key.expose(), "AIzaSy-very-secret");
        assert_eq!(key.clone().expose(), "AIzaSy-very-secret");
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(ApiKey::from("  k-1 \n").expose(), "k-1");
        assert!(ApiKey::new("   ").is_blank());
        assert!(ApiKey::parse(" \t").is_none());
        assert_eq!(ApiKey::parse(" k ").unwrap().expose(), "k");
    }
}
