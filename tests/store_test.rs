use chrono::{Duration, Utc};
use feed_curator::scoring::NEUTRAL_SCORE;
use feed_curator::types::{FeedStatus, Item, Result};
use feed_curator::Store;
use uuid::Uuid;

fn item_for(feed_id: Uuid, link: &str, age_days: i64, score: f64) -> Item {
    let now = Utc::now();
    Item {
        id: Uuid::new_v4(),
        feed_id,
        title: format!("Article {link}"),
        link: link.to_string(),
        raw_content: "body".to_string(),
        excerpt: "body".to_string(),
        author: Some("Jo".to_string()),
        published_at: now - Duration::days(age_days),
        fetched_at: now,
        summary: None,
        topics: vec!["technology".to_string()],
        entities: vec!["Acme".to_string()],
        relevance_score: score,
        embedding: Some(vec![0.5, 0.5]),
        is_read: false,
        is_favorite: false,
        user_feedback: None,
    }
}

#[tokio::test]
async fn item_roundtrip_preserves_all_fields() -> Result<()> {
    let store = Store::open_in_memory().await?;
    let feed = store.create_feed("https://example.com/f", None, 30).await?;
    let item = item_for(feed.id, "https://example.com/a", 2, 0.8);
    assert!(store.insert_item(&item).await?);

    let loaded = store.item(item.id).await?;
    assert_eq!(loaded.title, item.title);
    assert_eq!(loaded.link, item.link);
    assert_eq!(loaded.author.as_deref(), Some("Jo"));
    assert_eq!(loaded.topics, item.topics);
    assert_eq!(loaded.entities, item.entities);
    assert_eq!(loaded.embedding, item.embedding);
    assert_eq!(loaded.relevance_score, 0.8);
    assert!(!loaded.is_read);
    assert!(loaded.user_feedback.is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_link_is_not_inserted_twice() -> Result<()> {
    let store = Store::open_in_memory().await?;
    let feed = store.create_feed("https://example.com/f", None, 30).await?;
    let first = item_for(feed.id, "https://example.com/same", 0, NEUTRAL_SCORE);
    let second = item_for(feed.id, "https://example.com/same", 0, NEUTRAL_SCORE);

    assert!(store.insert_item(&first).await?);
    assert!(!store.insert_item(&second).await?);
    assert_eq!(store.all_items().await?.len(), 1);
    assert!(store
        .item_by_link("https://example.com/same")
        .await?
        .is_some());
    Ok(())
}

#[tokio::test]
async fn score_floor_and_date_range_queries_filter() -> Result<()> {
    let store = Store::open_in_memory().await?;
    let feed = store.create_feed("https://example.com/f", None, 30).await?;
    store
        .insert_item(&item_for(feed.id, "https://example.com/fresh-high", 0, 0.9))
        .await?;
    store
        .insert_item(&item_for(feed.id, "https://example.com/old-low", 10, 0.2))
        .await?;

    let top = store.items_with_min_score(0.5).await?;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].link, "https://example.com/fresh-high");

    let now = Utc::now();
    let recent = store
        .items_published_between(now - Duration::days(3), now + Duration::hours(1))
        .await?;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].link, "https://example.com/fresh-high");

    let all = store
        .items_published_between(now - Duration::days(30), now + Duration::hours(1))
        .await?;
    assert_eq!(all.len(), 2);
    Ok(())
}

#[tokio::test]
async fn items_for_feed_and_recent_items_are_scoped_and_limited() -> Result<()> {
    let store = Store::open_in_memory().await?;
    let feed_a = store.create_feed("https://example.com/a", None, 30).await?;
    let feed_b = store.create_feed("https://example.com/b", None, 30).await?;
    for (feed, n) in [(&feed_a, 3), (&feed_b, 2)] {
        for i in 0..n {
            store
                .insert_item(&item_for(
                    feed.id,
                    &format!("https://example.com/{}/{}", feed.id, i),
                    i,
                    NEUTRAL_SCORE,
                ))
                .await?;
        }
    }

    assert_eq!(store.items_for_feed(feed_a.id).await?.len(), 3);
    assert_eq!(store.items_for_feed(feed_b.id).await?.len(), 2);
    assert_eq!(store.recent_items(4).await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn read_favorite_flags_persist() -> Result<()> {
    let store = Store::open_in_memory().await?;
    let feed = store.create_feed("https://example.com/f", None, 30).await?;
    let item = item_for(feed.id, "https://example.com/a", 0, NEUTRAL_SCORE);
    store.insert_item(&item).await?;

    store.mark_read(item.id, true).await?;
    store.mark_favorite(item.id, true).await?;
    let loaded = store.item(item.id).await?;
    assert!(loaded.is_read);
    assert!(loaded.is_favorite);

    store.mark_read(item.id, false).await?;
    assert!(!store.item(item.id).await?.is_read);
    Ok(())
}

#[tokio::test]
async fn pause_and_resume_cycle_feed_status() -> Result<()> {
    let store = Store::open_in_memory().await?;
    let feed = store.create_feed("https://example.com/f", None, 30).await?;
    assert_eq!(feed.status, FeedStatus::Active);

    store.set_feed_status(feed.id, FeedStatus::Paused).await?;
    assert_eq!(store.feed(feed.id).await?.status, FeedStatus::Paused);

    store.set_feed_status(feed.id, FeedStatus::Active).await?;
    assert_eq!(store.feed(feed.id).await?.status, FeedStatus::Active);

    assert!(store.feed_by_url("https://example.com/f").await?.is_some());
    assert!(store.feed_by_url("https://example.com/zzz").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn profile_singleton_is_created_on_first_read() -> Result<()> {
    let store = Store::open_in_memory().await?;
    let profile = store.profile().await?;
    assert!(profile.interests.is_empty());
    assert_eq!(profile.notification_threshold, 0.7);

    let mut updated = profile.clone();
    updated.interests.push("rust".to_string());
    updated.notification_threshold = 0.5;
    store.save_profile(&updated).await?;

    let reloaded = store.profile().await?;
    assert_eq!(reloaded.interests, vec!["rust".to_string()]);
    assert_eq!(reloaded.notification_threshold, 0.5);
    Ok(())
}
