use crate::store::Store;
use crate::types::{Item, PreferenceProfile, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

/// Items older than this (by fetch time) are never notified about.
pub const FRESHNESS_WINDOW_MINUTES: i64 = 5;

/// Notification eligibility: notifications on, score at or above the
/// profile threshold, item unread, and fetched within the last 5 minutes.
pub fn should_notify(item: &Item, profile: &PreferenceProfile, now: DateTime<Utc>) -> bool {
    profile.notifications_enabled
        && item.relevance_score >= profile.notification_threshold
        && !item.is_read
        && now.signed_duration_since(item.fetched_at) <= Duration::minutes(FRESHNESS_WINDOW_MINUTES)
}

/// Evaluate the rule and record a notification when it passes. Record
/// creation is idempotent per item. Returns whether a record was created.
pub async fn notify_if_eligible(
    store: &Store,
    item: &Item,
    profile: &PreferenceProfile,
    now: DateTime<Utc>,
) -> Result<bool> {
    if !should_notify(item, profile, now) {
        return Ok(false);
    }
    let created = store.create_notification(item.id).await?;
    if created {
        info!(
            "notification for item {} (score {:.2})",
            item.id, item.relevance_score
        );
    }
    Ok(created)
}
