use crate::config::CuratorConfig;
use crate::fetcher::ContentFetcher;
use crate::store::Store;
use crate::types::{Feed, FeedStatus, FetchAttempt, FetchOutcome, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const BACKOFF_BASE_MINUTES: i64 = 5;
pub const BACKOFF_MAX_MINUTES: i64 = 240;

/// Consecutive failures before a feed's status flips to `error`.
pub const ERROR_STATUS_THRESHOLD: u32 = 3;

/// Retry delay after `failures` consecutive failures:
/// `min(5 * 2^(failures-1), 240)` minutes.
pub fn retry_delay_minutes(failures: u32) -> i64 {
    let exponent = failures.saturating_sub(1).min(16);
    (BACKOFF_BASE_MINUTES << exponent).min(BACKOFF_MAX_MINUTES)
}

#[derive(Debug, Default, Clone)]
pub struct PollSummary {
    pub polled: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub new_items: usize,
}

/// Tick-driven poll driver. Feeds are polled sequentially within a pass
/// to bound outbound HTTP load; enrichment runs detached. The backoff
/// table is owned here exclusively and dies with the process — a restart
/// simply re-polls failing feeds as if they had never failed.
pub struct FeedScheduler {
    store: Arc<Store>,
    fetcher: Arc<ContentFetcher>,
    attempts: HashMap<Uuid, FetchAttempt>,
    tick_interval: std::time::Duration,
}

impl FeedScheduler {
    pub fn new(store: Arc<Store>, fetcher: Arc<ContentFetcher>, config: &CuratorConfig) -> Self {
        Self {
            store,
            fetcher,
            attempts: HashMap::new(),
            tick_interval: config.tick_interval,
        }
    }

    /// Poll loop: one pass immediately at startup, then one per tick.
    /// A failing pass is logged and never halts the loop.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        loop {
            ticker.tick().await;
            match self.poll_due().await {
                Ok(summary) => debug!(
                    "scheduler pass: {} polled, {} ok, {} failed, {} new items",
                    summary.polled, summary.succeeded, summary.failed, summary.new_items
                ),
                Err(e) => error!("scheduler pass failed: {e}"),
            }
        }
    }

    /// One scheduler pass over every due feed, sequentially.
    pub async fn poll_due(&mut self) -> Result<PollSummary> {
        let now = Utc::now();
        let mut summary = PollSummary::default();

        for feed in self.store.list_feeds().await? {
            if !self.is_due(&feed, now) {
                continue;
            }
            summary.polled += 1;
            let result = self.fetcher.poll_feed(&feed).await;
            match result {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    summary.new_items += outcome.new_items;
                    self.record_poll_success(&feed, &outcome, Utc::now()).await?;
                }
                Err(e) => {
                    summary.failed += 1;
                    self.record_poll_failure(&feed, &e.to_string(), Utc::now())
                        .await?;
                }
            }
        }
        Ok(summary)
    }

    /// Due rule: paused feeds never; failing feeds once their backoff
    /// delay has elapsed; never-fetched feeds immediately; otherwise
    /// after the feed's own interval. Both active and error status are
    /// polled — error feeds keep retrying through the backoff path.
    pub fn is_due(&self, feed: &Feed, now: DateTime<Utc>) -> bool {
        if feed.status == FeedStatus::Paused {
            return false;
        }
        if let Some(attempt) = self.attempts.get(&feed.id) {
            return now.signed_duration_since(attempt.last_attempt_at)
                >= Duration::minutes(attempt.next_retry_delay_minutes);
        }
        match feed.last_fetched_at {
            None => true,
            Some(last) => {
                now.signed_duration_since(last) >= Duration::minutes(feed.fetch_interval_minutes)
            }
        }
    }

    /// Success clears the backoff entry and restores `active` status.
    pub async fn record_poll_success(
        &mut self,
        feed: &Feed,
        outcome: &FetchOutcome,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.attempts.remove(&feed.id);
        self.store
            .update_poll_success(
                feed.id,
                outcome.feed_title.as_deref(),
                outcome.new_items as i64,
                now,
            )
            .await
    }

    /// Failure bumps the feed's backoff entry; at the third consecutive
    /// failure the feed's status flips to `error` with the cause stored.
    pub async fn record_poll_failure(
        &mut self,
        feed: &Feed,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let attempt = self.attempts.entry(feed.id).or_insert(FetchAttempt {
            consecutive_failures: 0,
            last_attempt_at: now,
            next_retry_delay_minutes: BACKOFF_BASE_MINUTES,
        });
        attempt.consecutive_failures += 1;
        attempt.last_attempt_at = now;
        attempt.next_retry_delay_minutes = retry_delay_minutes(attempt.consecutive_failures);
        let failures = attempt.consecutive_failures;

        warn!(
            "feed {} failed ({} consecutive): {error}; next retry in {} minutes",
            feed.url, failures, attempt.next_retry_delay_minutes
        );

        if failures >= ERROR_STATUS_THRESHOLD {
            info!("feed {} marked as error after {failures} failures", feed.id);
            self.store.set_feed_error(feed.id, error).await?;
        }
        Ok(())
    }

    /// Backoff state for a feed, if it is currently failing.
    pub fn attempt(&self, feed_id: Uuid) -> Option<&FetchAttempt> {
        self.attempts.get(&feed_id)
    }
}
