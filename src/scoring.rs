use crate::store::Store;
use crate::types::{Item, PreferenceProfile, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

const TOPIC_WEIGHT: f64 = 0.4;
const ENTITY_WEIGHT: f64 = 0.3;
const RECENCY_WEIGHT: f64 = 0.2;
const EXCLUSION_PENALTY: f64 = 0.1;

/// Score for items with no topic/entity signal to weigh. Must stay
/// neutral, not zero, so un-enriched items don't always rank last.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Relevance of an item against a preference profile, in [0, 1].
///
/// Weighted sum of topic match, entity match, and recency, normalized by
/// the weights that actually applied; the excluded-topic penalty is
/// subtracted from the accumulator without entering the denominator. A
/// component is skipped when its required inputs are empty; when nothing
/// applies the score is the neutral [`NEUTRAL_SCORE`].
pub fn score_item(
    item: &Item,
    profile: &PreferenceProfile,
    weights: &HashMap<String, f64>,
    now: DateTime<Utc>,
) -> f64 {
    let topics = lowered(&item.topics);
    let entities = lowered(&item.entities);
    let interests = lowered(&profile.interests);
    let excluded = lowered(&profile.excluded_topics);

    let mut sum = 0.0;
    let mut total_weight = 0.0;

    if !topics.is_empty() && !interests.is_empty() {
        let mut matched = 0.0;
        for topic in &topics {
            if interests.iter().any(|interest| fuzzy_match(topic, interest)) {
                matched += weights.get(topic).copied().unwrap_or(1.0);
            }
        }
        let component = (matched / interests.len() as f64).min(1.0);
        sum += TOPIC_WEIGHT * component;
        total_weight += TOPIC_WEIGHT;
    }

    if !entities.is_empty() && !interests.is_empty() {
        let matched = entities
            .iter()
            .filter(|entity| interests.iter().any(|interest| fuzzy_match(entity, interest)))
            .count();
        let component = (matched as f64 / interests.len() as f64).min(1.0);
        sum += ENTITY_WEIGHT * component;
        total_weight += ENTITY_WEIGHT;
    }

    // Recency only weighs in once the item carries some topic/entity
    // signal; otherwise a fresh un-enriched item would outrank everything.
    if !topics.is_empty() || !entities.is_empty() {
        sum += RECENCY_WEIGHT * recency_factor(item.published_at, now);
        total_weight += RECENCY_WEIGHT;
    }

    if !topics.is_empty() && !excluded.is_empty() {
        let matched = topics
            .iter()
            .filter(|topic| excluded.iter().any(|ex| fuzzy_match(topic, ex)))
            .count();
        if matched > 0 {
            sum -= EXCLUSION_PENALTY * matched as f64 / topics.len() as f64;
        }
    }

    if total_weight == 0.0 {
        NEUTRAL_SCORE
    } else {
        (sum / total_weight).clamp(0.0, 1.0)
    }
}

/// 1.0 inside the first 24 hours, then a linear decay to 0 over the
/// following 29 days.
pub fn recency_factor(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age = now.signed_duration_since(published_at);
    let age_days = age.num_seconds() as f64 / 86_400.0;
    if age_days <= 1.0 {
        return 1.0;
    }
    (1.0 - (age_days - 1.0) / 29.0).clamp(0.0, 1.0)
}

/// Case-insensitive substring containment, either direction. Imprecise
/// on purpose ("ai" matches "air"); see DESIGN.md.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn lowered(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.trim().to_lowercase()).collect()
}

/// Recompute and persist one item's relevance score.
pub async fn rescore_item(store: &Store, item_id: Uuid) -> Result<f64> {
    let item = store.item(item_id).await?;
    let profile = store.profile().await?;
    let weights = store.weight_map().await?;
    let score = score_item(&item, &profile, &weights, Utc::now());
    store.set_relevance(item_id, score).await?;
    Ok(score)
}

/// Recompute and persist scores for every stored item. Invoked after
/// feedback events, when the scorer's weighted inputs have changed.
pub async fn rescore_all(store: &Store) -> Result<usize> {
    let profile = store.profile().await?;
    let weights = store.weight_map().await?;
    let now = Utc::now();
    let items = store.all_items().await?;
    let count = items.len();
    for item in items {
        let score = score_item(&item, &profile, &weights, now);
        store.set_relevance(item.id, score).await?;
    }
    debug!("rescored {count} items");
    Ok(count)
}
