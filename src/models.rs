// =============================================================================
// models.rs - THE EVIDENCE LOCKER
// =============================================================================
//
// Every incident we pull off the aggregator ends up as an `Article`. The
// shape is deliberately flat and boring because the dashboard on the other
// side of `/api/articles` reads these field names directly, and the
// checkpoint file on disk is just a pretty-printed array of them.
//
// The `date` field is a String on purpose. The aggregator writes dates like
// "14 March, 2024" and "3 Feb 2023" and we keep whatever it wrote. Parsing
// it into a calendar type would be the first step toward arguing with it.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Coarse provenance of the label printed above an incident.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Regulators and enforcement agencies.
    Official,
    /// Mainstream press.
    News,
    /// Investigative outfits and NGO reports.
    Report,
    /// Nobody we recognise.
    Unknown,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Official => write!(f, "official"),
            SourceType::News => write!(f, "news"),
            SourceType::Report => write!(f, "report"),
            SourceType::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Fraud,
    Crime,
    Corruption,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Fraud => write!(f, "fraud"),
            Topic::Crime => write!(f, "crime"),
            Topic::Corruption => write!(f, "corruption"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
        }
    }
}

/// Laundering technique ("modus") referenced by an incident.
///
/// Multi-label: one article can be about crypto AND a casino AND a shell
/// company, and frequently is. Declaration order is the order tags are
/// reported in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueTag {
    RealEstate,
    Cryptocurrency,
    LuxuryGoods,
    PreciousMetals,
    ShellBanking,
    Lending,
    Gaming,
    TradeBased,
    CashCourier,
    CashIntensiveRetail,
    CorporateVehicles,
    CharitableFronts,
    InsuranceFunds,
    /// Nothing in the vocabulary fired.
    Other,
}

impl fmt::Display for TechniqueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TechniqueTag::RealEstate => "real_estate",
            TechniqueTag::Cryptocurrency => "cryptocurrency",
            TechniqueTag::LuxuryGoods => "luxury_goods",
            TechniqueTag::PreciousMetals => "precious_metals",
            TechniqueTag::ShellBanking => "shell_banking",
            TechniqueTag::Lending => "lending",
            TechniqueTag::Gaming => "gaming",
            TechniqueTag::TradeBased => "trade_based",
            TechniqueTag::CashCourier => "cash_courier",
            TechniqueTag::CashIntensiveRetail => "cash_intensive_retail",
            TechniqueTag::CorporateVehicles => "corporate_vehicles",
            TechniqueTag::CharitableFronts => "charitable_fronts",
            TechniqueTag::InsuranceFunds => "insurance_funds",
            TechniqueTag::Other => "other",
        };
        write!(f, "{}", label)
    }
}

/// One incident record. This is the unit of output for the whole engine.
///
/// Invariants held by the pipeline (not by this struct):
/// `30 < title chars < 400`, `source chars < 100`, and `title` unique
/// within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// The free-text label printed on the line above the date.
    pub source: String,

    /// The line below the date. Doubles as the dedup key.
    pub title: String,

    /// Verbatim date line. Never parsed.
    pub date: String,

    /// Outbound citation link, when one of the page's anchors overlaps
    /// the title enough to be believable.
    pub url: Option<String>,

    pub source_type: SourceType,
    pub topic: Topic,
    pub severity: Severity,

    /// Warm-start files written before tags existed simply don't have them.
    #[serde(default)]
    pub technique_tags: Vec<TechniqueTag>,
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} / {} / {})",
            self.date, self.title, self.source, self.topic, self.severity
        )
    }
}

/// Where a crawl run is in its life.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Idle => write!(f, "idle"),
            JobState::Running => write!(f, "running"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
        }
    }
}

/// Why a run stopped walking pages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Hit the configured page ceiling.
    Exhausted,
    /// The site answered with a non-success status.
    EndOfPagination,
    /// Timeout or connection error. Still reported as `Completed`.
    FetchFailure,
}

/// The status record every poller sees. One writer (the run task),
/// any number of readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: String,
    pub current_page: u32,
    pub total_articles_so_far: usize,
    pub error: Option<String>,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_fetched: u32,
    /// True when the run ended on a fetch failure rather than a clean
    /// end-of-list. Both still land in `Completed`.
    pub stopped_early: bool,
    pub stop_reason: Option<StopReason>,
}

impl JobStatus {
    pub fn idle() -> Self {
        Self {
            state: JobState::Idle,
            progress: "Waiting for a crawl to be triggered".to_string(),
            current_page: 0,
            total_articles_so_far: 0,
            error: None,
            run_id: None,
            started_at: None,
            finished_at: None,
            pages_fetched: 0,
            stopped_early: false,
            stop_reason: None,
        }
    }

    /// Fresh status for a run that is starting right now.
    pub fn running(run_id: Uuid) -> Self {
        Self {
            state: JobState::Running,
            progress: "Starting crawl".to_string(),
            run_id: Some(run_id),
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub articles: usize,
    pub scraping: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_serializes_with_snake_case_labels() {
        let article = Article {
            source: "Europol".to_string(),
            title: "Crypto mixer dismantled in joint operation across Europe".to_string(),
            date: "14 March, 2024".to_string(),
            url: None,
            source_type: SourceType::Official,
            topic: Topic::Crime,
            severity: Severity::Medium,
            technique_tags: vec![TechniqueTag::Cryptocurrency, TechniqueTag::CashIntensiveRetail],
        };
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["source_type"], "official");
        assert_eq!(json["topic"], "crime");
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["technique_tags"][1], "cash_intensive_retail");
        assert!(json["url"].is_null());
    }

    #[test]
    fn test_article_without_tags_still_deserializes() {
        let raw = r#"{
            "source": "OCCRP",
            "title": "Leaked records show laundromat moved billions through Moldova",
            "date": "2 May 2021",
            "url": "https://www.occrp.org/en/laundromat",
            "source_type": "report",
            "topic": "crime",
            "severity": "medium"
        }"#;
        let article: Article = serde_json::from_str(raw).unwrap();
        assert_eq!(article.source_type, SourceType::Report);
        assert!(article.technique_tags.is_empty());
    }

    #[test]
    fn test_running_status_resets_counters() {
        let id = Uuid::new_v4();
        let status = JobStatus::running(id);
        assert!(status.is_running());
        assert_eq!(status.run_id, Some(id));
        assert_eq!(status.total_articles_so_far, 0);
        assert!(status.started_at.is_some());
        assert!(status.finished_at.is_none());
    }
}
