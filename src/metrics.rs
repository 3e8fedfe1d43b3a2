// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - Counting pages so you don't have to
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters for every interesting thing a crawl does. The run
// task bumps them, the HTTP surface snapshots them. Nobody takes a lock.
// Counters are process-lifetime totals, not per run; per-run numbers
// live in the JobStatus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

#[derive(Debug, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub pages_fetched: u64,
    pub pages_skipped: u64,
    pub fetch_failures: u64,
    pub candidates_seen: u64,
    pub duplicates_rejected: u64,
    pub articles_emitted: u64,
    pub links_correlated: u64,
    pub checkpoints_written: u64,
    pub pauses_taken: u64,
    pub uptime_seconds: u64,
    pub articles_per_minute: f64,
}

pub struct MetricsCollector {
    runs_started: AtomicU64,
    pages_fetched: AtomicU64,
    pages_skipped: AtomicU64,
    fetch_failures: AtomicU64,
    candidates_seen: AtomicU64,
    duplicates_rejected: AtomicU64,
    articles_emitted: AtomicU64,
    links_correlated: AtomicU64,
    checkpoints_written: AtomicU64,
    pauses_taken: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            pages_fetched: AtomicU64::new(0),
            pages_skipped: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            candidates_seen: AtomicU64::new(0),
            duplicates_rejected: AtomicU64::new(0),
            articles_emitted: AtomicU64::new(0),
            links_correlated: AtomicU64::new(0),
            checkpoints_written: AtomicU64::new(0),
            pauses_taken: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_runs_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pages_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pages_skipped(&self) {
        self.pages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fetch_failures(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_candidates_seen(&self, n: u64) {
        self.candidates_seen.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_duplicates_rejected(&self) {
        self.duplicates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_articles_emitted(&self) {
        self.articles_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_links_correlated(&self) {
        self.links_correlated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_checkpoints_written(&self) {
        self.checkpoints_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pauses_taken(&self) {
        self.pauses_taken.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        let emitted = self.articles_emitted.load(Ordering::Relaxed);
        let articles_per_minute = if uptime > 0 {
            (emitted as f64 / uptime as f64) * 60.0
        } else {
            0.0
        };

        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_skipped: self.pages_skipped.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            candidates_seen: self.candidates_seen.load(Ordering::Relaxed),
            duplicates_rejected: self.duplicates_rejected.load(Ordering::Relaxed),
            articles_emitted: emitted,
            links_correlated: self.links_correlated.load(Ordering::Relaxed),
            checkpoints_written: self.checkpoints_written.load(Ordering::Relaxed),
            pauses_taken: self.pauses_taken.load(Ordering::Relaxed),
            uptime_seconds: uptime,
            articles_per_minute,
        }
    }
}
