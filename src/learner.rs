use crate::scoring;
use crate::store::Store;
use crate::types::{Feedback, PreferenceWeight, Result, WEIGHT_MAX, WEIGHT_MIN};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Weight delta applied per feedback event. Entities move at half this.
pub const FEEDBACK_DELTA: f64 = 0.1;

/// Dislikes needed on a topic before it lands in the exclusion list.
pub const EXCLUSION_NEGATIVE_THRESHOLD: i64 = 3;

/// Converts explicit like/dislike signals into durable profile
/// adaptation: clamped weight accumulation, interest/exclusion list
/// updates, then a full rescore so the change applies everywhere.
pub struct FeedbackLearner {
    store: Arc<Store>,
}

impl FeedbackLearner {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Apply one feedback event. Fails with `ItemNotFound` before any
    /// mutation when the item is missing.
    pub async fn submit(&self, item_id: Uuid, feedback: Feedback) -> Result<()> {
        let item = self.store.item(item_id).await?;
        let delta = match feedback {
            Feedback::Like => FEEDBACK_DELTA,
            Feedback::Dislike => -FEEDBACK_DELTA,
        };

        for topic in &item.topics {
            self.adjust_weight(&normalize(topic), delta).await?;
        }
        // Entities adapt at half sensitivity.
        for entity in &item.entities {
            self.adjust_weight(&normalize(entity), delta / 2.0).await?;
        }

        let mut profile = self.store.profile().await?;
        match feedback {
            Feedback::Like => {
                for topic in &item.topics {
                    let topic = normalize(topic);
                    if !contains_ci(&profile.interests, &topic)
                        && !contains_ci(&profile.excluded_topics, &topic)
                    {
                        debug!("adding interest '{topic}'");
                        profile.interests.push(topic);
                    }
                }
            }
            Feedback::Dislike => {
                for topic in &item.topics {
                    let topic = normalize(topic);
                    if contains_ci(&profile.excluded_topics, &topic) {
                        continue;
                    }
                    if let Some(weight) = self.store.weight(&topic).await? {
                        if weight.negative_count >= EXCLUSION_NEGATIVE_THRESHOLD {
                            debug!("excluding topic '{topic}'");
                            profile.excluded_topics.push(topic);
                        }
                    }
                }
            }
        }
        self.store.save_profile(&profile).await?;
        self.store.set_feedback(item_id, Some(feedback)).await?;

        let rescored = scoring::rescore_all(&self.store).await?;
        info!(
            "feedback {} on item {}: rescored {} items",
            feedback.as_str(),
            item_id,
            rescored
        );
        Ok(())
    }

    async fn adjust_weight(&self, topic: &str, delta: f64) -> Result<()> {
        if topic.is_empty() {
            return Ok(());
        }
        let weight = match self.store.weight(topic).await? {
            Some(mut existing) => {
                existing.weight = (existing.weight + delta).clamp(WEIGHT_MIN, WEIGHT_MAX);
                if delta > 0.0 {
                    existing.positive_count += 1;
                } else {
                    existing.negative_count += 1;
                }
                existing
            }
            None => PreferenceWeight {
                topic: topic.to_string(),
                weight: (1.0 + delta).clamp(WEIGHT_MIN, WEIGHT_MAX),
                positive_count: if delta > 0.0 { 1 } else { 0 },
                negative_count: if delta > 0.0 { 0 } else { 1 },
            },
        };
        self.store.save_weight(&weight).await
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn contains_ci(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v.eq_ignore_ascii_case(value))
}
