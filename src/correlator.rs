// =============================================================================
// correlator.rs - WHICH LINK GOES WITH WHICH HEADLINE
// =============================================================================
//
// The aggregator paraphrases. The outbound link text is usually the
// original outlet's headline, the incident title is the aggregator's
// rewrite of it. They share words. Enough shared words and we call it a
// match.
//
// "Enough" is more than three distinct lower-cased whitespace tokens. The
// first link in page order that clears the bar wins, so the link index
// iterates deterministically.
// =============================================================================

use std::collections::HashSet;

use crate::links::LinkIndex;

/// A link must share strictly more than this many words with the title.
pub const MIN_SHARED_WORDS: usize = 3;

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Number of distinct lower-cased tokens two texts have in common.
pub fn shared_word_count(a: &str, b: &str) -> usize {
    word_set(a).intersection(&word_set(b)).count()
}

/// Find the citation URL for `title`, if any link overlaps enough.
pub fn correlate<'a>(title: &str, links: &'a LinkIndex) -> Option<&'a str> {
    if links.is_empty() {
        return None;
    }
    links
        .iter()
        .find(|(text, _)| shared_word_count(title, text) > MIN_SHARED_WORDS)
        .map(|(_, url)| url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_link_is_attached() {
        let mut links = LinkIndex::new();
        links.insert(
            "European money laundering fraud case details".to_string(),
            "https://example.org/case".to_string(),
        );
        let title = "Bank fraud scheme exposed in major European money laundering case";
        assert!(shared_word_count(title, "European money laundering fraud case details") > 3);
        assert_eq!(correlate(title, &links), Some("https://example.org/case"));
    }

    #[test]
    fn test_exactly_three_shared_words_is_not_enough() {
        let mut links = LinkIndex::new();
        links.insert(
            "Money laundering probe widens in Cyprus".to_string(),
            "https://example.org/cyprus".to_string(),
        );
        let title = "Police open money laundering probe into football club";
        assert_eq!(shared_word_count(title, "Money laundering probe widens in Cyprus"), 3);
        assert_eq!(correlate(title, &links), None);
    }

    #[test]
    fn test_first_matching_link_in_page_order_wins() {
        let mut links = LinkIndex::new();
        links.insert("Dutch bank fined over money laundering failures".to_string(), "https://a".to_string());
        links.insert("Dutch bank fined over money laundering lapses".to_string(), "https://b".to_string());
        let title = "Dutch bank fined over money laundering controls";
        assert_eq!(correlate(title, &links), Some("https://a"));
    }

    #[test]
    fn test_repeated_words_count_once() {
        assert_eq!(shared_word_count("gold gold gold gold", "Gold GOLD gold"), 1);
    }
}
