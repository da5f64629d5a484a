use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Active,
    Error,
    Paused,
}

impl FeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStatus::Active => "active",
            FeedStatus::Error => "error",
            FeedStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(FeedStatus::Active),
            "error" => Some(FeedStatus::Error),
            "paused" => Some(FeedStatus::Paused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: Uuid,
    pub url: String,
    pub title: Option<String>,
    pub fetch_interval_minutes: i64,
    pub status: FeedStatus,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Like,
    Dislike,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Like => "like",
            Feedback::Dislike => "dislike",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Feedback::Like),
            "dislike" => Some(Feedback::Dislike),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub title: String,
    /// Globally unique; the dedup key across all feeds.
    pub link: String,
    pub raw_content: String,
    pub excerpt: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
    pub relevance_score: f64,
    pub embedding: Option<Vec<f32>>,
    pub is_read: bool,
    pub is_favorite: bool,
    pub user_feedback: Option<Feedback>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub interests: Vec<String>,
    pub excluded_topics: Vec<String>,
    pub notification_threshold: f64,
    pub notifications_enabled: bool,
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            interests: Vec::new(),
            excluded_topics: Vec::new(),
            notification_threshold: 0.7,
            notifications_enabled: true,
        }
    }
}

/// Adaptive per-topic multiplier. `weight` stays within [0.1, 2.0].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceWeight {
    pub topic: String,
    pub weight: f64,
    pub positive_count: i64,
    pub negative_count: i64,
}

pub const WEIGHT_MIN: f64 = 0.1;
pub const WEIGHT_MAX: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Semantic,
    Topic,
    Entity,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Semantic => "semantic",
            ConnectionKind::Topic => "topic",
            ConnectionKind::Entity => "entity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "semantic" => Some(ConnectionKind::Semantic),
            "topic" => Some(ConnectionKind::Topic),
            "entity" => Some(ConnectionKind::Entity),
            _ => None,
        }
    }
}

/// Weighted edge between two items. The pair is unordered; rows are
/// stored with `item_a_id < item_b_id` so each pair exists at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub item_a_id: Uuid,
    pub item_b_id: Uuid,
    pub kind: ConnectionKind,
    pub strength: f64,
    pub shared_elements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub item_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Transient backoff state for a failing feed. Keyed by feed id in a map
/// owned by the scheduler; lost on restart, which simply re-polls the
/// feed as if it had never failed.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub consecutive_failures: u32,
    pub last_attempt_at: DateTime<Utc>,
    pub next_retry_delay_minutes: i64,
}

/// Result of a single feed poll.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub entries_seen: usize,
    pub new_items: usize,
    pub feed_title: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transient fetch failure: {0}")]
    TransientFetch(String),

    #[error("permanent fetch failure: {0}")]
    PermanentFetch(String),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("enrichment step failed: {0}")]
    Enrichment(String),

    #[error("feed not found: {id}")]
    FeedNotFound { id: Uuid },

    #[error("item not found: {id}")]
    ItemNotFound { id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CuratorError>;
