use crate::analysis::{Analyzer, Embedder};
use crate::config::CuratorConfig;
use crate::connections::{self, RelatedItem};
use crate::enrichment::EnrichmentPipeline;
use crate::fetcher::ContentFetcher;
use crate::learner::FeedbackLearner;
use crate::scheduler::{FeedScheduler, PollSummary};
use crate::store::Store;
use crate::types::{CuratorError, Feed, FeedStatus, Feedback, Item, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Top-level facade wiring store, fetcher, enrichment, learner, and
/// scheduler together behind one API.
pub struct FeedCurator {
    store: Arc<Store>,
    fetcher: Arc<ContentFetcher>,
    enrichment: Arc<EnrichmentPipeline>,
    learner: FeedbackLearner,
    config: CuratorConfig,
}

impl FeedCurator {
    pub fn new(
        store: Arc<Store>,
        analyzer: Arc<dyn Analyzer>,
        embedder: Arc<dyn Embedder>,
        config: CuratorConfig,
    ) -> Self {
        let enrichment = Arc::new(EnrichmentPipeline::new(
            Arc::clone(&store),
            analyzer,
            embedder,
            &config,
        ));
        let fetcher = Arc::new(ContentFetcher::new(
            config.fetch.clone(),
            Arc::clone(&store),
            Arc::clone(&enrichment),
        ));
        let learner = FeedbackLearner::new(Arc::clone(&store));
        Self {
            store,
            fetcher,
            enrichment,
            learner,
            config,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Validate the URL (parseable, http(s), fetchable, parseable feed),
    /// create the feed, and run its first poll immediately. A failing
    /// first poll leaves the feed for the scheduler to retry.
    pub async fn subscribe(&self, url: &str) -> Result<Feed> {
        if self.store.feed_by_url(url).await?.is_some() {
            return Err(CuratorError::Validation(format!(
                "already subscribed to {url}"
            )));
        }
        let document = self.fetcher.validate(url).await?;
        let feed = self
            .store
            .create_feed(
                url,
                document.title.clone(),
                self.config.default_fetch_interval_minutes,
            )
            .await?;

        match self.fetcher.poll_feed(&feed).await {
            Ok(outcome) => {
                self.store
                    .update_poll_success(
                        feed.id,
                        outcome.feed_title.as_deref(),
                        outcome.new_items as i64,
                        Utc::now(),
                    )
                    .await?;
            }
            Err(e) => warn!("initial poll of {url} failed: {e}"),
        }
        self.store.feed(feed.id).await
    }

    /// Delete the feed and everything hanging off it.
    pub async fn unsubscribe(&self, feed_id: Uuid) -> Result<()> {
        self.store.delete_feed(feed_id).await
    }

    pub async fn pause_feed(&self, feed_id: Uuid) -> Result<()> {
        self.store.set_feed_status(feed_id, FeedStatus::Paused).await
    }

    pub async fn resume_feed(&self, feed_id: Uuid) -> Result<()> {
        self.store.set_feed_status(feed_id, FeedStatus::Active).await
    }

    pub async fn feeds(&self) -> Result<Vec<Feed>> {
        self.store.list_feeds().await
    }

    /// One scheduler pass over the due feeds.
    pub async fn poll_all(&self) -> Result<PollSummary> {
        let mut scheduler = self.scheduler();
        scheduler.poll_due().await
    }

    /// A scheduler bound to this curator's store and fetcher. The
    /// returned value owns the in-memory backoff table.
    pub fn scheduler(&self) -> FeedScheduler {
        FeedScheduler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.fetcher),
            &self.config,
        )
    }

    /// Run the poll loop until the surrounding task is dropped.
    pub async fn run(&self) {
        info!("starting scheduler loop");
        self.scheduler().run().await
    }

    pub async fn submit_feedback(&self, item_id: Uuid, feedback: Feedback) -> Result<()> {
        self.learner.submit(item_id, feedback).await
    }

    pub async fn find_related(&self, item_id: Uuid, limit: usize) -> Result<Vec<RelatedItem>> {
        connections::find_related(&self.store, item_id, limit).await
    }

    pub async fn rebuild_connections(&self) -> Result<usize> {
        connections::rebuild_all(&self.store).await
    }

    /// Manual re-enrichment. Every chain step is idempotent, so this is
    /// safe on already-enriched items and cheap when nothing is missing.
    pub async fn re_enrich(&self, item_id: Uuid) -> Result<()> {
        self.store.item(item_id).await?;
        self.enrichment.enrich(item_id).await;
        Ok(())
    }

    pub async fn recent_items(&self, limit: i64) -> Result<Vec<Item>> {
        self.store.recent_items(limit).await
    }

    pub async fn top_items(&self, score_floor: f64) -> Result<Vec<Item>> {
        self.store.items_with_min_score(score_floor).await
    }

    pub async fn items_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Item>> {
        self.store.items_published_between(from, to).await
    }

    pub async fn mark_read(&self, item_id: Uuid, read: bool) -> Result<()> {
        self.store.mark_read(item_id, read).await
    }

    pub async fn mark_favorite(&self, item_id: Uuid, favorite: bool) -> Result<()> {
        self.store.mark_favorite(item_id, favorite).await
    }
}
