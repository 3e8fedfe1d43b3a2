// =============================================================================
// links.rs - THE CITATION HARVESTER
// =============================================================================
//
// Every page of the aggregator is littered with outbound anchors pointing
// at the original reporting. We collect them into a per-page index keyed
// by the anchor's visible text, and later try to match titles against it.
//
// An anchor makes it into the index only if:
//   - its href carries a scheme marker ("http")
//   - it does not point back at the aggregator itself
//   - its visible text is longer than 20 characters ("Read more" need not apply)
//
// Order matters. The correlator takes the FIRST entry that overlaps enough,
// so the index iterates in first-seen-on-page order. If the same text shows
// up twice, the entry keeps its original slot and takes the newer URL.
// =============================================================================

use std::collections::HashMap;

use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

/// Anchors with text this short or shorter are navigation, not citations.
const MIN_LINK_TEXT_CHARS: usize = 20;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static anchor selector"));

/// Link text -> absolute URL for one page.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl LinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Overwriting keeps the first-seen position.
    pub fn insert(&mut self, text: String, url: String) {
        match self.positions.get(&text) {
            Some(&idx) => self.entries[idx].1 = url,
            None => {
                self.positions.insert(text.clone(), self.entries.len());
                self.entries.push((text, url));
            }
        }
    }

    /// `(text, url)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, u)| (t.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the link index for an already parsed page.
pub fn extract_link_index(document: &Html, site_domain: &str) -> LinkIndex {
    let mut index = LinkIndex::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        // Each text fragment is trimmed on its own and glued back together.
        let text: String = anchor.text().map(str::trim).collect();

        if is_external_citation(href, site_domain) && text.chars().count() > MIN_LINK_TEXT_CHARS {
            index.insert(text, href.to_string());
        }
    }

    index
}

/// Scheme marker present and not pointing back at the aggregator.
fn is_external_citation(href: &str, site_domain: &str) -> bool {
    if memchr::memmem::find(href.as_bytes(), b"http").is_none() {
        return false;
    }
    let marker = site_domain.to_ascii_lowercase();
    match Url::parse(href) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => !host.to_ascii_lowercase().contains(&marker),
            None => false,
        },
        // Not a URL we can parse, but it mentions a scheme. Fall back to
        // a plain substring check on the whole href.
        Err(_) => !href.to_ascii_lowercase().contains(&marker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_for<'a>(index: &'a LinkIndex, text: &str) -> Option<&'a str> {
        index.iter().find(|(t, _)| *t == text).map(|(_, url)| url)
    }

    const PAGE: &str = r#"
        <html><body>
          <a href="https://thelaundrynews.com/about/">About The Laundry News and its editors</a>
          <a href="/page/2/">Older posts, of which there are many</a>
          <a href="https://www.occrp.org/en/investigations/laundromat">Inside the Russian laundromat investigation</a>
          <a href="https://www.bbc.co.uk/news/short">Short</a>
          <a href="https://www.theguardian.com/world/first">European money laundering fraud case details</a>
          <a href="https://www.theguardian.com/world/second">European money laundering fraud case details</a>
        </body></html>
    "#;

    #[test]
    fn test_only_long_external_links_are_kept() {
        let index = extract_link_index(&Html::parse_document(PAGE), "thelaundrynews");
        assert_eq!(index.len(), 2);
        assert!(url_for(&index, "About The Laundry News and its editors").is_none());
        assert!(url_for(&index, "Older posts, of which there are many").is_none());
        assert!(url_for(&index, "Short").is_none());
    }

    #[test]
    fn test_repeated_text_keeps_position_but_takes_last_url() {
        let index = extract_link_index(&Html::parse_document(PAGE), "thelaundrynews");
        let order: Vec<_> = index.iter().map(|(t, _)| t).collect();
        assert_eq!(
            order,
            vec![
                "Inside the Russian laundromat investigation",
                "European money laundering fraud case details",
            ]
        );
        assert_eq!(
            url_for(&index, "European money laundering fraud case details"),
            Some("https://www.theguardian.com/world/second")
        );
    }

    #[test]
    fn test_text_of_exactly_twenty_chars_is_dropped() {
        let markup = r#"<a href="https://example.org/x">12345678901234567890</a>
                        <a href="https://example.org/y">123456789012345678901</a>"#;
        let index = extract_link_index(&Html::parse_document(markup), "thelaundrynews");
        assert_eq!(index.len(), 1);
        assert_eq!(url_for(&index, "123456789012345678901"), Some("https://example.org/y"));
    }

    #[test]
    fn test_site_domain_check_is_on_the_host() {
        assert!(!is_external_citation("https://www.thelaundrynews.com/x", "thelaundrynews"));
        assert!(is_external_citation("https://www.occrp.org/x", "thelaundrynews"));
        assert!(!is_external_citation("mailto:tips@occrp.org", "thelaundrynews"));
    }
}
