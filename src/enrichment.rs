use crate::analysis::{Analyzer, Embedder, MAX_ENTITIES, MAX_TOPICS};
use crate::config::CuratorConfig;
use crate::connections;
use crate::notify;
use crate::scoring;
use crate::store::Store;
use crate::types::{CuratorError, Item, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

/// Runs the ordered analysis → rescore → notify → embed → connect chain
/// for one item. Chains are spawned detached from the fetch loop; a step
/// failure aborts only the remainder of that item's chain. Every step
/// checks for already-present data first, so re-running the chain on an
/// enriched item performs no collaborator calls.
pub struct EnrichmentPipeline {
    store: Arc<Store>,
    analyzer: Arc<dyn Analyzer>,
    embedder: Arc<dyn Embedder>,
    collaborator_timeout: Duration,
    embed_char_budget: usize,
}

impl EnrichmentPipeline {
    pub fn new(
        store: Arc<Store>,
        analyzer: Arc<dyn Analyzer>,
        embedder: Arc<dyn Embedder>,
        config: &CuratorConfig,
    ) -> Self {
        Self {
            store,
            analyzer,
            embedder,
            collaborator_timeout: config.collaborator_timeout,
            embed_char_budget: config.embed_char_budget,
        }
    }

    /// Fire-and-forget: the fetch loop hands items off here and returns
    /// without waiting on collaborator latency.
    pub fn spawn(self: &Arc<Self>, item_id: Uuid) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.enrich(item_id).await;
        })
    }

    /// Run the full chain, logging instead of propagating failures; the
    /// scheduler and other items' chains are never affected.
    pub async fn enrich(&self, item_id: Uuid) {
        if let Err(e) = self.run_chain(item_id).await {
            warn!("enrichment chain aborted for item {item_id}: {e}");
        }
    }

    async fn run_chain(&self, item_id: Uuid) -> Result<()> {
        let mut item = self.store.item(item_id).await?;

        // Step 1: analyze, unless a prior run already populated it.
        if item.summary.is_none() || item.topics.is_empty() {
            let analysis = timeout(
                self.collaborator_timeout,
                self.analyzer.analyze(&item.title, &item.raw_content),
            )
            .await
            .map_err(|_| CuratorError::Enrichment("analysis call timed out".to_string()))??;

            let mut topics = analysis.topics;
            topics.truncate(MAX_TOPICS);
            let mut entities = analysis.entities;
            entities.truncate(MAX_ENTITIES);
            self.store
                .apply_analysis(item_id, &analysis.summary, &topics, &entities)
                .await?;
            item.summary = Some(analysis.summary);
            item.topics = topics;
            item.entities = entities;
        } else {
            debug!("item {item_id} already analyzed, skipping");
        }

        // Step 2: rescore now that topics/entities exist.
        item.relevance_score = scoring::rescore_item(&self.store, item_id).await?;

        // Step 3: notification check against the now-current score.
        let profile = self.store.profile().await?;
        notify::notify_if_eligible(&self.store, &item, &profile, Utc::now()).await?;

        // Step 4: embed, unless a vector already exists.
        let mut embedded_now = false;
        if item.embedding.is_none() {
            let text = compose_embedding_text(&item, self.embed_char_budget);
            let vector = timeout(self.collaborator_timeout, self.embedder.embed(&text))
                .await
                .map_err(|_| CuratorError::Enrichment("embedding call timed out".to_string()))??;
            self.store.set_embedding(item_id, &vector).await?;
            embedded_now = true;
        } else {
            debug!("item {item_id} already embedded, skipping");
        }

        // Step 5: connection detection, only when step 4 produced a new
        // vector.
        if embedded_now {
            connections::connect_item(&self.store, item_id).await?;
        }

        Ok(())
    }
}

/// Title + summary-or-excerpt + topics + entities, truncated to the
/// configured character budget before the embedding call.
pub fn compose_embedding_text(item: &Item, budget: usize) -> String {
    let body = item.summary.as_deref().unwrap_or(&item.excerpt);
    let text = format!(
        "{}\n{}\n{}\n{}",
        item.title,
        body,
        item.topics.join(", "),
        item.entities.join(", ")
    );
    if text.chars().count() <= budget {
        text
    } else {
        text.chars().take(budget).collect()
    }
}
