// =============================================================================
// dedup.rs - SEEN IT
// =============================================================================
//
// The aggregator repeats itself. Sticky posts, "most read" sidebars, the
// same incident cross-filed under two tags. Within one run, a title we have
// already emitted is dropped on sight.
//
// The set lives exactly as long as the run. A new run starts empty and will
// happily re-emit everything, because every run is a full rewrite of the
// store rather than an incremental merge. No probabilistic filter here: a
// false positive would silently drop a real incident.
// =============================================================================

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

/// Exact title set for one crawl run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    checks: u64,
    duplicates: u64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the title is NEW (and records it), `false` if this
    /// run has already seen it.
    pub fn check_and_insert(&mut self, title: &str) -> bool {
        self.checks += 1;
        if self.contains(title) {
            self.duplicates += 1;
            debug!(title = title, "Duplicate title dropped");
            return false;
        }
        self.seen.insert(title.to_string());
        true
    }

    pub fn contains(&self, title: &str) -> bool {
        self.seen.contains(title)
    }

    pub fn snapshot(&self) -> DedupSnapshot {
        DedupSnapshot {
            total_checks: self.checks,
            unique_titles: self.seen.len(),
            duplicates_caught: self.duplicates,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DedupSnapshot {
    pub total_checks: u64,
    pub unique_titles: usize,
    pub duplicates_caught: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_titles_are_accepted() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.check_and_insert("Casino operator fined over suspicious transactions"));
        assert!(dedup.contains("Casino operator fined over suspicious transactions"));
    }

    #[test]
    fn test_duplicate_titles_are_rejected() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.check_and_insert("Casino operator fined over suspicious transactions"));
        assert!(!dedup.check_and_insert("Casino operator fined over suspicious transactions"));
        assert_eq!(
            dedup.snapshot(),
            DedupSnapshot { total_checks: 2, unique_titles: 1, duplicates_caught: 1 }
        );
    }

    #[test]
    fn test_match_is_exact() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.check_and_insert("Casino operator fined over suspicious transactions"));
        assert!(dedup.check_and_insert("casino operator fined over suspicious transactions"));
    }

    #[test]
    fn test_fresh_run_starts_empty() {
        let mut first = Deduplicator::new();
        assert!(first.check_and_insert("Gold smuggling route through Dubai exposed by leak"));
        let mut second = Deduplicator::new();
        assert!(second.check_and_insert("Gold smuggling route through Dubai exposed by leak"));
    }
}
