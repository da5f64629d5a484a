use chrono::{Duration, Utc};
use feed_curator::scheduler::{retry_delay_minutes, FeedScheduler, BACKOFF_MAX_MINUTES};
use feed_curator::types::{FeedStatus, FetchOutcome, Result};
use feed_curator::{
    ContentFetcher, CuratorConfig, EnrichmentPipeline, HashEmbedder, HeuristicAnalyzer, Store,
};
use std::sync::Arc;

async fn build_scheduler() -> Result<(Arc<Store>, FeedScheduler)> {
    let store = Arc::new(Store::open_in_memory().await?);
    let config = CuratorConfig::default();
    let enrichment = Arc::new(EnrichmentPipeline::new(
        Arc::clone(&store),
        Arc::new(HeuristicAnalyzer),
        Arc::new(HashEmbedder::default()),
        &config,
    ));
    let fetcher = Arc::new(ContentFetcher::new(
        config.fetch.clone(),
        Arc::clone(&store),
        enrichment,
    ));
    let scheduler = FeedScheduler::new(Arc::clone(&store), fetcher, &config);
    Ok((store, scheduler))
}

fn empty_outcome() -> FetchOutcome {
    FetchOutcome {
        entries_seen: 0,
        new_items: 0,
        feed_title: None,
    }
}

#[test]
fn backoff_ladder_doubles_and_caps() {
    assert_eq!(retry_delay_minutes(1), 5);
    assert_eq!(retry_delay_minutes(2), 10);
    assert_eq!(retry_delay_minutes(3), 20);
    assert_eq!(retry_delay_minutes(4), 40);
    assert_eq!(retry_delay_minutes(6), 160);
    assert_eq!(retry_delay_minutes(7), BACKOFF_MAX_MINUTES);
    assert_eq!(retry_delay_minutes(50), BACKOFF_MAX_MINUTES);
}

#[tokio::test]
async fn never_fetched_feed_is_due_immediately() -> Result<()> {
    let (store, scheduler) = build_scheduler().await?;
    let feed = store.create_feed("https://example.com/a", None, 30).await?;
    assert!(scheduler.is_due(&feed, Utc::now()));
    Ok(())
}

#[tokio::test]
async fn fetched_feed_is_due_after_its_interval() -> Result<()> {
    let (store, mut scheduler) = build_scheduler().await?;
    let feed = store.create_feed("https://example.com/a", None, 30).await?;
    let now = Utc::now();

    scheduler
        .record_poll_success(&feed, &empty_outcome(), now)
        .await?;
    let feed = store.feed(feed.id).await?;

    assert!(!scheduler.is_due(&feed, now + Duration::minutes(29)));
    assert!(scheduler.is_due(&feed, now + Duration::minutes(30)));
    Ok(())
}

#[tokio::test]
async fn paused_feed_is_never_due() -> Result<()> {
    let (store, scheduler) = build_scheduler().await?;
    let feed = store.create_feed("https://example.com/a", None, 30).await?;
    store.set_feed_status(feed.id, FeedStatus::Paused).await?;
    let feed = store.feed(feed.id).await?;
    assert!(!scheduler.is_due(&feed, Utc::now() + Duration::days(365)));
    Ok(())
}

#[tokio::test]
async fn three_failures_flip_status_to_error_with_twenty_minute_backoff() -> Result<()> {
    let (store, mut scheduler) = build_scheduler().await?;
    let feed = store.create_feed("https://example.com/a", None, 30).await?;
    let now = Utc::now();

    scheduler
        .record_poll_failure(&feed, "connection refused", now)
        .await?;
    assert_eq!(store.feed(feed.id).await?.status, FeedStatus::Active);

    scheduler
        .record_poll_failure(&feed, "connection refused", now + Duration::minutes(5))
        .await?;
    assert_eq!(store.feed(feed.id).await?.status, FeedStatus::Active);

    let third_attempt = now + Duration::minutes(15);
    scheduler
        .record_poll_failure(&feed, "connection refused", third_attempt)
        .await?;

    let feed = store.feed(feed.id).await?;
    assert_eq!(feed.status, FeedStatus::Error);
    assert_eq!(feed.last_error.as_deref(), Some("connection refused"));

    // Fourth attempt is scheduled no sooner than min(5 * 2^2, 240) = 20
    // minutes after the third.
    let attempt = scheduler.attempt(feed.id).expect("backoff entry");
    assert_eq!(attempt.consecutive_failures, 3);
    assert_eq!(attempt.next_retry_delay_minutes, 20);
    assert!(!scheduler.is_due(&feed, third_attempt + Duration::minutes(19)));
    assert!(scheduler.is_due(&feed, third_attempt + Duration::minutes(20)));
    Ok(())
}

#[tokio::test]
async fn success_clears_backoff_and_restores_active_status() -> Result<()> {
    let (store, mut scheduler) = build_scheduler().await?;
    let feed = store.create_feed("https://example.com/a", None, 30).await?;
    let now = Utc::now();

    for i in 0..3 {
        scheduler
            .record_poll_failure(&feed, "timeout", now + Duration::minutes(i * 5))
            .await?;
    }
    assert_eq!(store.feed(feed.id).await?.status, FeedStatus::Error);

    let recovery = now + Duration::minutes(60);
    scheduler
        .record_poll_success(&feed, &empty_outcome(), recovery)
        .await?;

    let feed = store.feed(feed.id).await?;
    assert_eq!(feed.status, FeedStatus::Active);
    assert!(feed.last_error.is_none());
    let fetched = feed.last_fetched_at.expect("last_fetched_at set");
    assert!((fetched - recovery).num_seconds().abs() < 1);
    assert!(scheduler.attempt(feed.id).is_none());

    // Back on the normal interval path.
    assert!(!scheduler.is_due(&feed, recovery + Duration::minutes(10)));
    assert!(scheduler.is_due(&feed, recovery + Duration::minutes(30)));
    Ok(())
}

#[tokio::test]
async fn error_feed_keeps_retrying_through_backoff() -> Result<()> {
    let (store, mut scheduler) = build_scheduler().await?;
    let feed = store.create_feed("https://example.com/a", None, 30).await?;
    let now = Utc::now();

    for i in 0..4 {
        scheduler
            .record_poll_failure(&feed, "timeout", now + Duration::minutes(i * 60))
            .await?;
    }
    let feed = store.feed(feed.id).await?;
    assert_eq!(feed.status, FeedStatus::Error);

    // Still due eventually: error feeds are retried, never abandoned.
    let attempt = scheduler.attempt(feed.id).expect("backoff entry");
    assert_eq!(attempt.next_retry_delay_minutes, 40);
    assert!(scheduler.is_due(
        &feed,
        attempt.last_attempt_at + Duration::minutes(attempt.next_retry_delay_minutes)
    ));
    Ok(())
}

#[tokio::test]
async fn poll_counts_new_items_into_feed_counter() -> Result<()> {
    let (store, mut scheduler) = build_scheduler().await?;
    let feed = store.create_feed("https://example.com/a", None, 30).await?;

    let outcome = FetchOutcome {
        entries_seen: 5,
        new_items: 3,
        feed_title: Some("Example".to_string()),
    };
    scheduler
        .record_poll_success(&feed, &outcome, Utc::now())
        .await?;

    let feed = store.feed(feed.id).await?;
    assert_eq!(feed.item_count, 3);
    assert_eq!(feed.title.as_deref(), Some("Example"));
    Ok(())
}
