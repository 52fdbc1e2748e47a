use serde::{Deserialize, Serialize};

/// One address to geocode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    /// Text as extracted from the page.
    pub source_address: String,

    /// Text sent to the provider: the source address with the area hint
    /// appended when the address does not already mention it.
    pub query_address: String,
}

impl QueryItem {
    pub fn new(source_address: impl Into<String>, area_hint: Option<&str>) -> Self {
        let source_address = source_address.into();
        let query_address = with_hint(&source_address, area_hint);
        Self {
            source_address,
            query_address,
        }
    }

    /// Build a queue from extracted addresses, sharing one area hint.
    pub fn batch<I, S>(addresses: I, area_hint: Option<&str>) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        addresses
            .into_iter()
            .map(|address| Self::new(address, area_hint))
            .collect()
    }
}

fn with_hint(address: &str, hint: Option<&str>) -> String {
    let address = address.trim();
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) if !address.to_lowercase().contains(&hint.to_lowercase()) => {
            format!("{}, {}", address, hint)
        }
        _ => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_is_appended() {
        let item = QueryItem::new("123 Main St", Some("Springfield, IL"));
        assert_eq!(item.source_address, "123 Main St");
        assert_eq!(item.query_address, "123 Main St, Springfield, IL");
    }

    #[test]
    fn test_hint_already_present_is_not_repeated() {
        let item = QueryItem::new("123 Main St, SPRINGFIELD, il", Some("Springfield, IL"));
        assert_eq!(item.query_address, "123 Main St, SPRINGFIELD, il");
    }

    #[test]
    fn test_blank_hint_is_ignored() {
        assert_eq!(QueryItem::new("5 Oak Rd", Some("  ")).query_address, "5 Oak Rd");
        assert_eq!(QueryItem::new("5 Oak Rd", None).query_address, "5 Oak Rd");
    }

    #[test]
    fn test_batch() {
        let items = QueryItem::batch(vec!["1 A St", "2 B St"], Some("Town"));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].query_address, "2 B St, Town");
    }
}
