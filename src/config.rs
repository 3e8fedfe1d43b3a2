// =============================================================================
// config.rs - THE KNOB CABINET
// =============================================================================
//
// Every tunable in the engine lives here and every one of them can be
// overridden from the environment (prefix LAUNDRY_NEWS_), because
// hardcoding the politeness pause is how you get your IP blocked by a
// small news site that never did anything to you.
//
// Unparsable values quietly fall back to the default. A typo in an env
// var should not stop the crawl.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // CRAWL TARGET
    // =========================================================================

    /// Site root. Page 1 is this URL, page N is `{base_url}/page/{N}/`.
    pub base_url: String,

    /// Marker for the site's own host. Anchors pointing back at the
    /// aggregator are not citations.
    pub site_domain: String,

    /// Browser-ish identification sent with every page request.
    pub user_agent: String,

    /// Per-page network timeout. The only deadline a run has.
    pub request_timeout: Duration,

    // =========================================================================
    // RUN SHAPE
    // =========================================================================

    /// Highest page index a run will try.
    pub max_pages: u32,

    /// Checkpoint cadence in pages. Default: 25.
    pub checkpoint_every_pages: u32,

    /// Politeness cadence in pages. Default: every 10 pages we take a breath.
    pub pause_every_pages: u32,

    /// How long that breath lasts.
    pub pause_duration: Duration,

    /// Extra attempts on timeout/connection errors. 0 = no retries.
    pub fetch_retries: u32,

    /// Base delay for the exponential retry backoff.
    pub retry_backoff: Duration,

    // =========================================================================
    // STORAGE
    // =========================================================================

    /// Where the pretty-printed article array is checkpointed.
    pub store_path: PathBuf,

    /// A persisted store must hold MORE than this many articles to be
    /// trusted as a warm start.
    pub min_cached_articles: usize,

    /// Kick off a crawl at boot when there is no usable warm start.
    pub auto_start: bool,

    // =========================================================================
    // HTTP SURFACE
    // =========================================================================

    pub api_port: u16,
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        let port = env::var("LAUNDRY_NEWS_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.api_port);

        Config {
            base_url: env_or_default("LAUNDRY_NEWS_BASE_URL", &defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            site_domain: env_or_default("LAUNDRY_NEWS_SITE_DOMAIN", &defaults.site_domain),
            user_agent: env_or_default("LAUNDRY_NEWS_USER_AGENT", &defaults.user_agent),
            request_timeout: Duration::from_secs(
                env_or_default("LAUNDRY_NEWS_REQUEST_TIMEOUT_SECS", "10").parse().unwrap_or(10),
            ),

            max_pages: env_or_default("LAUNDRY_NEWS_MAX_PAGES", "300")
                .parse().unwrap_or(defaults.max_pages),
            checkpoint_every_pages: env_or_default("LAUNDRY_NEWS_CHECKPOINT_EVERY", "25")
                .parse().unwrap_or(defaults.checkpoint_every_pages),
            pause_every_pages: env_or_default("LAUNDRY_NEWS_PAUSE_EVERY", "10")
                .parse().unwrap_or(defaults.pause_every_pages),
            pause_duration: Duration::from_millis(
                env_or_default("LAUNDRY_NEWS_PAUSE_MILLIS", "1000").parse().unwrap_or(1000),
            ),
            fetch_retries: env_or_default("LAUNDRY_NEWS_FETCH_RETRIES", "0")
                .parse().unwrap_or(0),
            retry_backoff: Duration::from_millis(
                env_or_default("LAUNDRY_NEWS_RETRY_BACKOFF_MILLIS", "500").parse().unwrap_or(500),
            ),

            store_path: PathBuf::from(env_or_default("LAUNDRY_NEWS_STORE_PATH", "articles.json")),
            min_cached_articles: env_or_default("LAUNDRY_NEWS_MIN_CACHED_ARTICLES", "10")
                .parse().unwrap_or(defaults.min_cached_articles),
            auto_start: parse_bool(&env_or_default("LAUNDRY_NEWS_AUTO_START", "true"))
                .unwrap_or(defaults.auto_start),

            api_port: port,
        }
    }

    /// Address of page `page` (1-based). Page 1 is the bare site root.
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            format!("{}/", self.base_url)
        } else {
            format!("{}/page/{}/", self.base_url, page)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "https://thelaundrynews.com".to_string(),
            site_domain: "thelaundrynews".to_string(),
            user_agent: "Mozilla/5.0 (compatible; LaundryNewsEngine/0.1)".to_string(),
            request_timeout: Duration::from_secs(10),
            max_pages: 300,
            checkpoint_every_pages: 25,
            pause_every_pages: 10,
            pause_duration: Duration::from_millis(1000),
            fetch_retries: 0,
            retry_backoff: Duration::from_millis(500),
            store_path: PathBuf::from("articles.json"),
            min_cached_articles: 10,
            auto_start: true,
            api_port: 5000,
        }
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_one_is_site_root() {
        let config = Config::default();
        assert_eq!(config.page_url(1), "https://thelaundrynews.com/");
        assert_eq!(config.page_url(7), "https://thelaundrynews.com/page/7/");
    }

    #[test]
    fn test_defaults_keep_politeness_and_checkpoint_cadence() {
        let config = Config::default();
        assert_eq!(config.checkpoint_every_pages, 25);
        assert_eq!(config.pause_every_pages, 10);
        assert_eq!(config.fetch_retries, 0);
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
