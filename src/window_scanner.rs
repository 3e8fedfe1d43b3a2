// =============================================================================
// window_scanner.rs - THREE LINES AT A TIME
// =============================================================================
//
// The aggregator has no stable markup for its incident cards. What it DOES
// have, once you flatten the page to visible text, is a reliable rhythm:
//
//     OCCRP                                   <- source label
//     14 March, 2024                          <- date
//     Leaked records show laundromat moved... <- title
//
// So we find every date-shaped line and look one line up and one line down.
// That's the whole trick. It breaks the moment the site changes layout, and
// we accept that in exchange for not depending on a single CSS class name.
//
// Everything in here is pure: markup in, candidates out. No network, no
// shared state, no dedup (the run owns that).
// =============================================================================

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node};
use thiserror::Error;

use crate::links::{self, LinkIndex};

/// 1-2 digit day, a month word, optional comma, 4-digit year. Anchored at
/// the start of the line only; trailing text is tolerated.
static DATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2} \w+,? \d{4}").expect("static date regex"));

/// Elements whose text is code, not prose. The document `<title>` is kept
/// and becomes the first line.
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

pub const MAX_SOURCE_CHARS: usize = 100;
pub const MIN_TITLE_CHARS: usize = 30;
pub const MAX_TITLE_CHARS: usize = 400;

/// A source/date/title triple that passed the length gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source: String,
    pub date: String,
    pub title: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page body is not markup ({0} bytes)")]
    Malformed(usize),
}

/// Everything one page yields before classification.
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    pub links: LinkIndex,
    pub candidates: Vec<Candidate>,
}

/// Parse a page once and run both extractors over it.
pub fn extract_page(markup: &str, site_domain: &str) -> Result<PageExtract, PageError> {
    if markup.trim().is_empty() || memchr::memchr(b'<', markup.as_bytes()).is_none() {
        return Err(PageError::Malformed(markup.len()));
    }
    let document = Html::parse_document(markup);
    let links = links::extract_link_index(&document, site_domain);
    let lines = visible_lines(&document);
    Ok(PageExtract {
        links,
        candidates: scan_lines(&lines),
    })
}

/// Flatten the document's visible text and split it into trimmed,
/// non-empty lines.
pub fn visible_lines(document: &Html) -> Vec<String> {
    let mut flat = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            flat.push_str(text);
        }
    }
    split_lines(&flat)
}

pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_date_line(line: &str) -> bool {
    DATE_LINE.is_match(line)
}

/// The window scan. The first and last lines can never anchor a window
/// because they are missing a neighbour.
pub fn scan_lines(lines: &[String]) -> Vec<Candidate> {
    if lines.len() < 3 {
        return Vec::new();
    }

    (1..lines.len() - 1)
        .filter(|&i| is_date_line(&lines[i]))
        .filter_map(|i| {
            let source = &lines[i - 1];
            let title = &lines[i + 1];
            passes_length_gates(source, title).then(|| Candidate {
                source: source.clone(),
                date: lines[i].clone(),
                title: title.clone(),
            })
        })
        .collect()
}

fn passes_length_gates(source: &str, title: &str) -> bool {
    let title_chars = title.chars().count();
    source.chars().count() < MAX_SOURCE_CHARS
        && title_chars > MIN_TITLE_CHARS
        && title_chars < MAX_TITLE_CHARS
}
