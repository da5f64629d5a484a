use crate::config::FetchConfig;
use crate::enrichment::EnrichmentPipeline;
use crate::parser::{self, NormalizedEntry, ParsedDocument};
use crate::scoring::{self, NEUTRAL_SCORE};
use crate::store::Store;
use crate::types::{CuratorError, Feed, FetchOutcome, Item, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Retrieves one feed's document, normalizes its entries, and persists
/// the genuinely new ones. New items get a placeholder score and are
/// handed to the enrichment pipeline without blocking the poll.
pub struct ContentFetcher {
    client: Client,
    config: FetchConfig,
    store: Arc<Store>,
    enrichment: Arc<EnrichmentPipeline>,
}

impl ContentFetcher {
    pub fn new(config: FetchConfig, store: Arc<Store>, enrichment: Arc<EnrichmentPipeline>) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            store,
            enrichment,
        }
    }

    /// Subscribe-time validation: the URL must parse with an http(s)
    /// scheme and the feed must be fetchable and parseable.
    pub async fn validate(&self, url: &str) -> Result<ParsedDocument> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CuratorError::Validation(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        let body = self
            .fetch_document(url)
            .await
            .map_err(|e| CuratorError::Validation(format!("feed is not fetchable: {e}")))?;
        parser::parse_document(&body, Utc::now())
            .map_err(|e| CuratorError::Validation(format!("feed is not parseable: {e}")))
    }

    /// Poll one feed. A malformed entry is skipped and logged; it never
    /// fails the poll.
    pub async fn poll_feed(&self, feed: &Feed) -> Result<FetchOutcome> {
        debug!("polling feed {} ({})", feed.url, feed.id);
        let body = self.fetch_document(&feed.url).await?;
        let fetched_at = Utc::now();
        let document = parser::parse_document(&body, fetched_at)?;

        let mut new_items = 0;
        for entry in &document.entries {
            match self.process_entry(feed, entry, fetched_at).await {
                Ok(true) => new_items += 1,
                Ok(false) => {}
                Err(e) => warn!("skipping entry {}: {e}", entry.link),
            }
        }

        info!(
            "feed {}: {} entries, {} new",
            feed.url,
            document.entries.len(),
            new_items
        );
        Ok(FetchOutcome {
            entries_seen: document.entries.len(),
            new_items,
            feed_title: document.title,
        })
    }

    /// Fetch with up to `max_attempts` tries and a 1s/2s/4s delay ladder.
    /// Permanent failures (404/403-class) surface immediately.
    async fn fetch_document(&self, url: &str) -> Result<String> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.config.retry_initial_delay,
            initial_interval: self.config.retry_initial_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.config.retry_initial_delay * 8,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error =
            CuratorError::TransientFetch("no fetch attempt was made".to_string());

        for attempt in 1..=self.config.max_attempts {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => return Ok(body),
                            Err(e) => {
                                last_error =
                                    CuratorError::TransientFetch(format!("body read failed: {e}"));
                            }
                        }
                    } else if is_permanent(status) {
                        return Err(CuratorError::PermanentFetch(format!(
                            "HTTP {} for {}",
                            status, url
                        )));
                    } else {
                        last_error = CuratorError::TransientFetch(format!(
                            "HTTP {} for {}",
                            status, url
                        ));
                    }
                }
                Err(e) => {
                    last_error = CuratorError::TransientFetch(e.to_string());
                }
            }

            if attempt < self.config.max_attempts {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("attempt {attempt} failed for {url}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error)
    }

    /// Persist a new item unless its link is already known, give it a
    /// best-effort placeholder score, and hand it to enrichment.
    async fn process_entry(
        &self,
        feed: &Feed,
        entry: &NormalizedEntry,
        fetched_at: DateTime<Utc>,
    ) -> Result<bool> {
        if self.store.item_by_link(&entry.link).await?.is_some() {
            debug!("duplicate link {}, skipping", entry.link);
            return Ok(false);
        }

        let item = Item {
            id: Uuid::new_v4(),
            feed_id: feed.id,
            title: entry.title.clone(),
            link: entry.link.clone(),
            raw_content: entry.content.clone(),
            excerpt: entry.excerpt.clone(),
            author: entry.author.clone(),
            published_at: entry.published_at,
            fetched_at,
            summary: None,
            topics: Vec::new(),
            entities: Vec::new(),
            relevance_score: NEUTRAL_SCORE,
            embedding: None,
            is_read: false,
            is_favorite: false,
            user_feedback: None,
        };
        if !self.store.insert_item(&item).await? {
            return Ok(false);
        }

        // Placeholder score from empty topics/entities; the chain's
        // rescore step supersedes it once analysis lands.
        scoring::rescore_item(&self.store, item.id).await?;
        self.enrichment.spawn(item.id);
        Ok(true)
    }
}

fn is_permanent(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED | StatusCode::GONE
    )
}
