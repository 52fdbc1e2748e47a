//! Text helpers: whitespace normalization, location-string extraction and the
//! textual similarity used by auto-exclusion.

use std::collections::HashSet;

use crate::page::{ElementKey, Page};

/// Weight of the character-length ratio in [`text_similarity`].
const LENGTH_WEIGHT: f64 = 0.3;
/// Weight of agreement on "contains digits".
const NUMERIC_WEIGHT: f64 = 0.3;
/// Weight of the word-count ratio.
const WORD_COUNT_WEIGHT: f64 = 0.2;
/// Weight of agreement on "looks like a URL".
const URL_WEIGHT: f64 = 0.2;

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of each match, normalized, with empty and repeated strings dropped.
///
/// Repeats are detected case-insensitively; the first occurrence wins, so the
/// output keeps page order.
pub fn location_strings<P: Page + ?Sized>(page: &P, matches: &[ElementKey]) -> Vec<String> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .filter(|key| page.contains(**key))
        .map(|key| page.text(*key))
        .filter(|text| !text.is_empty())
        .filter(|text| seen.insert(text.to_lowercase()))
        .collect()
}

/// Rough textual likeness of two strings in `[0, 1]`.
///
/// Combines the length ratio, agreement on containing digits, the word-count
/// ratio and agreement on URL-likeness. Symmetric in its arguments.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let length = ratio(a.chars().count(), b.chars().count());
    let numeric = agreement(has_digit(a), has_digit(b));
    let words = ratio(a.split_whitespace().count(), b.split_whitespace().count());
    let url = agreement(looks_like_url(a), looks_like_url(b));

    LENGTH_WEIGHT * length + NUMERIC_WEIGHT * numeric + WORD_COUNT_WEIGHT * words + URL_WEIGHT * url
}

fn ratio(a: usize, b: usize) -> f64 {
    let max = a.max(b);
    if max == 0 {
        1.0
    } else {
        a.min(b) as f64 / max as f64
    }
}

fn agreement(a: bool, b: bool) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

fn looks_like_url(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;

    #[test]
    fn test_identical_text_scores_one() {
        assert!((text_similarity("123 Main St", "123 Main St") - 1.0).abs() < 1e-9);
        assert!((text_similarity("", "") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_similarity_is_symmetric() {
        let pairs = [
            ("123 Main St, Springfield", "Sponsored"),
            ("https://example.com/a", "456 Oak Ave"),
            ("", "something"),
        ];
        for (a, b) in pairs {
            assert_eq!(text_similarity(a, b), text_similarity(b, a));
        }
    }

    #[test]
    fn test_address_vs_short_label_is_dissimilar() {
        let score = text_similarity("123 Main St, Springfield", "Ad");
        assert!(score < 0.3, "score was {}", score);
    }

    #[test]
    fn test_two_addresses_are_similar() {
        let score = text_similarity("123 Main St, Springfield", "456 Oak Ave, Springfield");
        assert!(score > 0.9, "score was {}", score);
    }

    #[test]
    fn test_location_strings_dedupes_and_skips_empty() {
        let page = HtmlPage::parse(
            r#"<ul>
                <li>  12 Elm St </li>
                <li></li>
                <li>12 ELM st</li>
                <li>9 Pine Rd</li>
            </ul>"#,
        );
        let snap = page.snapshot();
        let items = snap.find("li").unwrap();
        assert_eq!(location_strings(&snap, &items), vec!["12 Elm St", "9 Pine Rd"]);
    }
}
