use std::time::Duration;

/// HTTP fetch settings shared by feed polling and validation.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt (1s, 2s, 4s).
    pub retry_initial_delay: Duration,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "feed-curator/0.1".to_string(),
            timeout_seconds: 30,
            max_attempts: 3,
            retry_initial_delay: Duration::from_secs(1),
            max_redirects: 5,
        }
    }
}

/// Runtime settings for the scheduler and enrichment pipeline.
#[derive(Debug, Clone)]
pub struct CuratorConfig {
    pub fetch: FetchConfig,
    /// Scheduler tick; each tick polls whichever feeds are due.
    pub tick_interval: Duration,
    /// Interval assigned to newly subscribed feeds.
    pub default_fetch_interval_minutes: i64,
    /// Timeout around each analysis/embedding collaborator call.
    pub collaborator_timeout: Duration,
    /// Character budget for composed embedding input text.
    pub embed_char_budget: usize,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            tick_interval: Duration::from_secs(300),
            default_fetch_interval_minutes: 30,
            collaborator_timeout: Duration::from_secs(30),
            embed_char_budget: 6000,
        }
    }
}
