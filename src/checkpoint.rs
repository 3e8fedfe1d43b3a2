// =============================================================================
// checkpoint.rs - SAVE EARLY, SAVE OFTEN, NEVER SAVE HALF
// =============================================================================
//
// A full crawl is hundreds of pages. Nobody wants to wait for all of them
// to see the first result, and nobody wants a crash at page 280 to cost
// everything. So every N pages (and always at the end) the run hands its
// whole accumulated collection to the checkpointer, which:
//
// 1. Swaps a fresh immutable snapshot into the in-memory cache. Readers
//    clone an Arc; they never see a vector that is being pushed to.
// 2. Writes the collection as pretty-printed JSON to `<store>.tmp` and
//    renames it over the store. The file on disk is either the previous
//    checkpoint or this one, never a torn mix.
//
// The file is overwritten wholesale every time. It is never appended to.
// Each snapshot is a prefix of the next one because the run only ever
// pushes to the end of its collection.
// =============================================================================

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Article;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to (de)serialize articles: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The collection every reader sees. Published as whole snapshots.
#[derive(Debug, Default)]
pub struct ArticleCache {
    current: RwLock<Arc<Vec<Article>>>,
}

impl ArticleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the visible collection in one step.
    pub fn publish(&self, articles: Vec<Article>) {
        *self.current.write() = Arc::new(articles);
    }

    pub fn snapshot(&self) -> Arc<Vec<Article>> {
        Arc::clone(&self.current.read())
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Checkpointer {
    path: PathBuf,
    cache: Arc<ArticleCache>,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>, cache: Arc<ArticleCache>) -> Self {
        Self {
            path: path.into(),
            cache,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Publish `articles` to readers and persist them. Returns how many
    /// articles were written.
    pub async fn checkpoint(&self, articles: &[Article]) -> Result<usize, CheckpointError> {
        self.cache.publish(articles.to_vec());

        let json = serde_json::to_string_pretty(articles)?;
        let tmp = tmp_path(&self.path);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CheckpointError::Io { path: parent.to_path_buf(), source })?;
        }
        tokio::fs::write(&tmp, json.as_bytes())
            .await
            .map_err(|source| CheckpointError::Io { path: tmp.clone(), source })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| CheckpointError::Io { path: self.path.clone(), source })?;

        debug!(
            path = %self.path.display(),
            articles = articles.len(),
            bytes = json.len(),
            "Checkpoint written"
        );
        Ok(articles.len())
    }
}

/// Read a previously written store. A missing file is `Ok(None)`.
pub async fn load_store(path: &Path) -> Result<Option<Vec<Article>>, CheckpointError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CheckpointError::Io { path: path.to_path_buf(), source });
        }
    };
    let articles: Vec<Article> = serde_json::from_str(&raw)?;
    Ok(Some(articles))
}

/// Seed the cache from disk if the store is big enough to trust.
/// Returns `true` when the warm start was used.
pub async fn warm_start(path: &Path, min_articles: usize, cache: &ArticleCache) -> bool {
    match load_store(path).await {
        Ok(Some(articles)) if articles.len() > min_articles => {
            info!(
                path = %path.display(),
                articles = articles.len(),
                "📂 Warm start from persisted store"
            );
            cache.publish(articles);
            true
        }
        Ok(Some(articles)) => {
            info!(
                articles = articles.len(),
                threshold = min_articles,
                "Persisted store too small to trust, ignoring it"
            );
            false
        }
        Ok(None) => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Persisted store unreadable, ignoring it");
            false
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, SourceType, TechniqueTag, Topic};

    fn article(n: usize) -> Article {
        Article {
            source: "OCCRP".to_string(),
            title: format!("Incident number {n} in a long series of laundering cases"),
            date: "14 March, 2024".to_string(),
            url: None,
            source_type: SourceType::Report,
            topic: Topic::Crime,
            severity: Severity::Medium,
            technique_tags: vec![TechniqueTag::Other],
        }
    }

    #[tokio::test]
    async fn test_checkpoint_writes_pretty_json_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        let cache = Arc::new(ArticleCache::new());
        let checkpointer = Checkpointer::new(&path, Arc::clone(&cache));

        let articles: Vec<_> = (0..3).map(article).collect();
        assert_eq!(checkpointer.checkpoint(&articles).await.unwrap(), 3);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("[\n  {"), "not pretty-printed: {raw}");
        assert_eq!(cache.snapshot().as_slice(), articles.as_slice());
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_successive_checkpoints_are_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("articles.json");
        let cache = Arc::new(ArticleCache::new());
        let checkpointer = Checkpointer::new(&path, Arc::clone(&cache));

        let mut articles: Vec<_> = (0..4).map(article).collect();
        checkpointer.checkpoint(&articles).await.unwrap();
        let early = load_store(&path).await.unwrap().unwrap();

        articles.extend((4..9).map(article));
        checkpointer.checkpoint(&articles).await.unwrap();
        let late = load_store(&path).await.unwrap().unwrap();

        assert_eq!(early.len(), 4);
        assert_eq!(late.len(), 9);
        assert_eq!(&late[..early.len()], early.as_slice());
    }

    #[tokio::test]
    async fn test_non_ascii_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        let checkpointer = Checkpointer::new(&path, Arc::new(ArticleCache::new()));
        let mut a = article(1);
        a.source = "Süddeutsche Zeitung".to_string();
        checkpointer.checkpoint(&[a]).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Süddeutsche"));
    }

    #[tokio::test]
    async fn test_missing_store_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_store(&dir.path().join("nope.json")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_warm_start_requires_more_than_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        let checkpointer = Checkpointer::new(&path, Arc::new(ArticleCache::new()));

        checkpointer.checkpoint(&(0..10).map(article).collect::<Vec<_>>()).await.unwrap();
        let cache = ArticleCache::new();
        assert!(!warm_start(&path, 10, &cache).await);
        assert!(cache.is_empty());

        checkpointer.checkpoint(&(0..11).map(article).collect::<Vec<_>>()).await.unwrap();
        assert!(warm_start(&path, 10, &cache).await);
        assert_eq!(cache.len(), 11);
    }

    #[tokio::test]
    async fn test_garbage_store_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cache = ArticleCache::new();
        assert!(!warm_start(&path, 0, &cache).await);
    }
}
