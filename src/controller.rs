// =============================================================================
// controller.rs - THE ONE AND ONLY CRAWL
// =============================================================================
//
// The JobController owns the status record, the article cache and the
// machinery that fills them. It runs at most ONE crawl at a time:
//
//   Idle | Completed | Failed  --start-->  Running
//   Running                    --start-->  "already running" (nothing queued)
//   Running  --pages exhausted / end of pagination / fetch failure-->  Completed
//   Running  --anything escaping the page loop (incl. panics)-->      Failed
//
// A run is a detached tokio task. Whoever triggered it gets an answer
// immediately and then polls `/api/status` like everybody else. There is
// no cancel button: a run ends when the site runs out of pages, the network
// gives up on us, or we hit `max_pages`.
//
// Per page:
//   fetch -> parse once -> {link index, window candidates}
//         -> dedup -> classify (rayon) -> correlate link -> append
//
// Every `checkpoint_every_pages` pages and once at the very end, the whole
// collection goes to the checkpointer. Every `pause_every_pages` pages we
// sleep for `pause_duration` so the aggregator's admin doesn't have to
// learn our IP address.
// =============================================================================

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::checkpoint::{ArticleCache, Checkpointer};
use crate::classifier::{Classification, Classifier};
use crate::config::Config;
use crate::correlator;
use crate::dedup::Deduplicator;
use crate::fetcher::{FetchError, PageFetcher, PageOutcome};
use crate::metrics::MetricsCollector;
use crate::models::{Article, HealthReport, JobState, JobStatus, StopReason};
use crate::window_scanner::{self, Candidate};

/// Answer to a trigger request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Uuid),
    AlreadyRunning,
}

/// How the page loop ended, when it ended without blowing up.
#[derive(Debug, Clone)]
struct CrawlSummary {
    stop_reason: StopReason,
    pages_fetched: u32,
    fetch_error: Option<String>,
}

/// State private to one run: its articles and its dedup set.
#[derive(Default)]
struct RunAccumulator {
    articles: Vec<Article>,
    dedup: Deduplicator,
}

pub struct JobController {
    config: Arc<Config>,
    status: RwLock<JobStatus>,
    cache: Arc<ArticleCache>,
    checkpointer: Checkpointer,
    fetcher: PageFetcher,
    classifier: Classifier,
    metrics: Arc<MetricsCollector>,
}

impl JobController {
    pub fn new(
        config: Arc<Config>,
        cache: Arc<ArticleCache>,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Arc<Self>, FetchError> {
        let fetcher = PageFetcher::new(Arc::clone(&config))?;
        let checkpointer = Checkpointer::new(config.store_path.clone(), Arc::clone(&cache));
        Ok(Arc::new(Self {
            config,
            status: RwLock::new(JobStatus::idle()),
            cache,
            checkpointer,
            fetcher,
            classifier: Classifier::standard().clone(),
            metrics,
        }))
    }

    pub fn status(&self) -> JobStatus {
        self.status.read().clone()
    }

    pub fn articles(&self) -> Arc<Vec<Article>> {
        self.cache.snapshot()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            articles: self.cache.len(),
            scraping: self.status.read().is_running(),
        }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Start a run unless one is already going. Never blocks on the crawl.
    pub fn start(self: &Arc<Self>) -> StartOutcome {
        let run_id = {
            let mut status = self.status.write();
            if status.is_running() {
                debug!(run_id = ?status.run_id, "Trigger rejected, a crawl is already running");
                return StartOutcome::AlreadyRunning;
            }
            let run_id = Uuid::new_v4();
            *status = JobStatus::running(run_id);
            run_id
        };

        // A new run replaces the collection wholesale.
        self.cache.publish(Vec::new());
        self.metrics.increment_runs_started();

        info!(run_id = %run_id, max_pages = self.config.max_pages, "🔍 Crawl started");
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.execute(run_id).await;
        });

        StartOutcome::Started(run_id)
    }

    /// The outer guard. Whatever happens in the page loop, the status record
    /// leaves `Running` and a final checkpoint is attempted.
    async fn execute(self: Arc<Self>, run_id: Uuid) {
        let mut run = RunAccumulator::default();
        let crawl_result = guarded(self.crawl(&mut run)).await;
        self.finish(run_id, crawl_result, &run).await;
    }

    /// Final checkpoint plus the terminal status transition.
    async fn finish(
        &self,
        run_id: Uuid,
        crawl_result: anyhow::Result<CrawlSummary>,
        run: &RunAccumulator,
    ) {
        let final_checkpoint = self.checkpointer.checkpoint(&run.articles).await;
        if final_checkpoint.is_ok() {
            self.metrics.increment_checkpoints_written();
        }

        let total = run.articles.len();
        let mut status = self.status.write();
        status.finished_at = Some(Utc::now());
        status.total_articles_so_far = total;

        match (crawl_result, final_checkpoint) {
            (Ok(summary), Ok(_)) => {
                status.state = JobState::Completed;
                status.pages_fetched = summary.pages_fetched;
                status.stop_reason = Some(summary.stop_reason);
                status.stopped_early = summary.stop_reason == StopReason::FetchFailure;
                status.error = summary.fetch_error;
                status.progress = format!(
                    "Done: {} articles from {} pages",
                    total, summary.pages_fetched
                );
                info!(
                    run_id = %run_id,
                    articles = total,
                    pages = summary.pages_fetched,
                    stop_reason = ?summary.stop_reason,
                    stopped_early = status.stopped_early,
                    dedup = ?run.dedup.snapshot(),
                    "✅ Crawl complete"
                );
            }
            (Err(e), _) => {
                status.state = JobState::Failed;
                status.error = Some(format!("{e:#}"));
                status.progress = "Crawl failed".to_string();
                error!(run_id = %run_id, error = %e, articles = total, "❌ Crawl failed");
            }
            (Ok(_), Err(e)) => {
                status.state = JobState::Failed;
                status.error = Some(e.to_string());
                status.progress = "Final checkpoint failed".to_string();
                error!(run_id = %run_id, error = %e, articles = total, "❌ Final checkpoint failed");
            }
        }
    }

    async fn crawl(&self, run: &mut RunAccumulator) -> anyhow::Result<CrawlSummary> {
        let config = Arc::clone(&self.config);
        let mut summary = CrawlSummary {
            stop_reason: StopReason::Exhausted,
            pages_fetched: 0,
            fetch_error: None,
        };

        for page in 1..=config.max_pages {
            self.update_status(|s| {
                s.current_page = page;
                s.progress = format!("Fetching page {page}");
            });

            match self.fetcher.fetch(page).await {
                Ok(PageOutcome::Markup(markup)) => {
                    summary.pages_fetched += 1;
                    self.metrics.increment_pages_fetched();
                    let added = self.process_page(page, &markup, run);
                    debug!(page = page, added = added, total = run.articles.len(), "Page processed");
                }
                Ok(PageOutcome::EndOfPagination(code)) => {
                    info!(page = page, status = %code, "Reached end of pagination");
                    summary.stop_reason = StopReason::EndOfPagination;
                    break;
                }
                Err(e) => {
                    warn!(page = page, error = %e, "Fetch failed, ending crawl early");
                    self.metrics.increment_fetch_failures();
                    summary.stop_reason = StopReason::FetchFailure;
                    summary.fetch_error = Some(e.to_string());
                    break;
                }
            }

            let total = run.articles.len();
            let pages_fetched = summary.pages_fetched;
            self.update_status(|s| {
                s.total_articles_so_far = total;
                s.pages_fetched = pages_fetched;
                s.progress = format!("Scraped {page} pages, {total} articles so far");
            });

            if config.checkpoint_every_pages > 0 && page % config.checkpoint_every_pages == 0 {
                self.checkpointer.checkpoint(&run.articles).await?;
                self.metrics.increment_checkpoints_written();
                info!(
                    page = page,
                    articles = total,
                    path = %self.checkpointer.path().display(),
                    "💾 Checkpoint"
                );
            }

            self.politeness_pause(page, total).await;
        }

        Ok(summary)
    }

    /// Sleep after every `pause_every_pages`-th page, except the last one.
    /// Returns whether it slept.
    async fn politeness_pause(&self, page: u32, total: usize) -> bool {
        let config = &self.config;
        if config.pause_every_pages == 0
            || page % config.pause_every_pages != 0
            || page >= config.max_pages
        {
            return false;
        }
        info!(page = page, articles = total, "Scraped {} pages, {} articles so far", page, total);
        self.metrics.increment_pauses_taken();
        tokio::time::sleep(config.pause_duration).await;
        true
    }

    /// Window-scan one page and append whatever survives. Returns how many
    /// articles were added. A malformed page adds nothing and is not an error.
    fn process_page(&self, page: u32, markup: &str, run: &mut RunAccumulator) -> usize {
        let extract = match window_scanner::extract_page(markup, &self.config.site_domain) {
            Ok(extract) => extract,
            Err(e) => {
                warn!(page = page, error = %e, "Skipping malformed page");
                self.metrics.increment_pages_skipped();
                return 0;
            }
        };

        self.metrics.add_candidates_seen(extract.candidates.len() as u64);
        debug!(
            page = page,
            candidates = extract.candidates.len(),
            links = extract.links.len(),
            "Page scanned"
        );

        let fresh: Vec<Candidate> = extract
            .candidates
            .into_iter()
            .filter(|c| {
                let new = run.dedup.check_and_insert(&c.title);
                if !new {
                    self.metrics.increment_duplicates_rejected();
                }
                new
            })
            .collect();

        let classifications = self.classifier.classify_batch(&fresh);
        let added = fresh.len();

        for (candidate, classification) in fresh.into_iter().zip(classifications) {
            let url = correlator::correlate(&candidate.title, &extract.links).map(str::to_string);
            if url.is_some() {
                self.metrics.increment_links_correlated();
            }
            run.articles.push(build_article(candidate, url, classification));
            self.metrics.increment_articles_emitted();
        }

        added
    }

    fn update_status(&self, f: impl FnOnce(&mut JobStatus)) {
        f(&mut *self.status.write());
    }
}

fn build_article(candidate: Candidate, url: Option<String>, c: Classification) -> Article {
    Article {
        source: candidate.source,
        title: candidate.title,
        date: candidate.date,
        url,
        source_type: c.source_type,
        topic: c.topic,
        severity: c.severity,
        technique_tags: c.technique_tags,
    }
}

/// Turn a panic anywhere inside `fut` into an ordinary error.
async fn guarded<T>(fut: impl Future<Output = anyhow::Result<T>>) -> anyhow::Result<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("crawl task panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
