// ██╗      █████╗ ██╗   ██╗███╗   ██╗██████╗ ██████╗ ██╗   ██╗
// ██║     ██╔══██╗██║   ██║████╗  ██║██╔══██╗██╔══██╗╚██╗ ██╔╝
// ██║     ███████║██║   ██║██╔██╗ ██║██║  ██║██████╔╝ ╚████╔╝
// ██║     ██╔══██║██║   ██║██║╚██╗██║██║  ██║██╔══██╗  ╚██╔╝
// ███████╗██║  ██║╚██████╔╝██║ ╚████║██████╔╝██║  ██║   ██║
// ╚══════╝╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═══╝╚═════╝ ╚═╝  ╚═╝   ╚═╝
//
// N E W S   E N G I N E
//
// Several hundred pages of loosely formatted incident summaries go in.
// A tidy JSON array of money-laundering cases comes out, each one with
// a date, a source, a citation link if we can find one, and a handful
// of labels nobody should mistake for analysis.

mod checkpoint;
mod classifier;
mod config;
mod controller;
mod correlator;
mod dedup;
mod fetcher;
mod links;
mod metrics;
mod models;
mod server;
mod window_scanner;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::checkpoint::ArticleCache;
use crate::config::Config;
use crate::controller::{JobController, StartOutcome};
use crate::metrics::MetricsCollector;

fn print_banner() {
    let banner = r#"

    ╔══════════════════════════════════════════════════════════════════╗
    ║                                                                  ║
    ║        ██╗      █████╗ ██╗   ██╗███╗   ██╗██████╗ ██████╗         ║
    ║        ██║     ██╔══██╗██║   ██║████╗  ██║██╔══██╗██╔══██╗        ║
    ║        ██║     ███████║██║   ██║██╔██╗ ██║██║  ██║██████╔╝        ║
    ║        ██║     ██╔══██║██║   ██║██║╚██╗██║██║  ██║██╔══██╗        ║
    ║        ███████╗██║  ██║╚██████╔╝██║ ╚████║██████╔╝██║  ██║        ║
    ║        ╚══════╝╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═══╝╚═════╝ ╚═╝  ╚═╝        ║
    ║                                                                  ║
    ║        🧺 MONEY-LAUNDERING NEWS CRAWLER 🧺                       ║
    ║                                                                  ║
    ║   Extraction: date-line windows over visible page text           ║
    ║   Citations:  word-overlap correlation with outbound links       ║
    ║   Labels:     Aho-Corasick keyword vocabularies                  ║
    ║   Storage:    atomic JSON checkpoints every few dozen pages      ║
    ║                                                                  ║
    ║   "Follow the money. Then write it down."                        ║
    ║                                                                  ║
    ╚══════════════════════════════════════════════════════════════════╝

    "#;
    println!("{}", banner);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LAUNDRY_NEWS_LOG_JSON")
        .map(|v| config::parse_bool(&v).unwrap_or(false))
        .unwrap_or(false);

    if json {
        fmt().with_env_filter(filter).json().with_current_span(false).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .init();
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    print_banner();

    info!("🧺 LAUNDRY NEWS ENGINE initializing...");

    let config = Arc::new(Config::from_env());
    info!(
        base_url = %config.base_url,
        max_pages = config.max_pages,
        store = %config.store_path.display(),
        "✅ Configuration loaded"
    );

    let cache = Arc::new(ArticleCache::new());
    let metrics_collector = Arc::new(MetricsCollector::new());
    let controller = JobController::new(
        Arc::clone(&config),
        Arc::clone(&cache),
        Arc::clone(&metrics_collector),
    )?;
    info!("✅ Job controller online");

    // ═══════════════════════════════════════════
    // WARM START OR FIRST CRAWL
    // ═══════════════════════════════════════════
    let warmed = checkpoint::warm_start(&config.store_path, config.min_cached_articles, &cache).await;
    if warmed {
        info!(articles = cache.len(), "✅ Serving persisted articles, no crawl at boot");
    } else if config.auto_start {
        match controller.start() {
            StartOutcome::Started(run_id) => info!(run_id = %run_id, "🚀 No usable store, crawling now"),
            StartOutcome::AlreadyRunning => warn!("A crawl was somehow already running at boot"),
        }
    } else {
        info!("Auto-start disabled, waiting for POST /api/scrape");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ═══════════════════════════════════════════
    // SPAWN API SERVER
    // ═══════════════════════════════════════════
    let server_controller = Arc::clone(&controller);
    let port = config.api_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_api_server(port, server_controller, shutdown_rx).await {
            error!("🌐 API server error: {:#}", e);
        }
        info!("🌐 API server: OFFLINE");
    });

    info!("═══════════════════════════════════════════════════════");
    info!("  🟢 LAUNDRY NEWS ENGINE ACTIVE");
    info!("  🌐 API at http://0.0.0.0:{}/api/articles", port);
    info!("  📊 Metrics at http://0.0.0.0:{}/metrics", port);
    info!("  ⚡ Press Ctrl+C for graceful shutdown");
    info!("═══════════════════════════════════════════════════════");

    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("🛑 Shutdown signal received!");
        }
        Err(err) => {
            error!("❌ Signal listener error: {}", err);
        }
    }
    let _ = shutdown_tx.send(true);

    // A running crawl is not waited for. Its last checkpoint is what survives.
    if controller.status().is_running() {
        warn!(
            articles = cache.len(),
            "Crawl still running at shutdown, last checkpoint stands"
        );
    }

    info!("⏳ Waiting for the API server to stop (timeout: 10s)...");
    let _ = tokio::time::timeout(Duration::from_secs(10), server_handle).await;

    info!(metrics = ?metrics_collector.snapshot(), "💀 LAUNDRY NEWS ENGINE: OFFLINE");
    Ok(())
}
