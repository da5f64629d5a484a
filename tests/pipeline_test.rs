use async_trait::async_trait;
use feed_curator::analysis::{Analysis, Analyzer, Embedder, HashEmbedder, HeuristicAnalyzer};
use feed_curator::types::{Item, Result};
use feed_curator::{ContentFetcher, CuratorConfig, EnrichmentPipeline, FeedCurator, Store};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

const FEED_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>Tech Journal</title>
  <item>
    <title>New software release</title>
    <link>https://journal.example/software-release</link>
    <description>The software team at Acme shipped a new digital platform for internet services.</description>
  </item>
  <item>
    <title>Programming language trends</title>
    <link>https://journal.example/language-trends</link>
    <description>Internet surveys show programming and software tooling gaining ground at Acme and beyond.</description>
  </item>
</channel>
</rss>
"#;

/// Minimal HTTP server handing out a fixed feed document, so the fetch
/// path is exercised hermetically.
async fn serve_feed(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}/feed.xml")
}

struct CountingAnalyzer {
    inner: HeuristicAnalyzer,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Analyzer for CountingAnalyzer {
    async fn analyze(&self, title: &str, content: &str) -> Result<Analysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.analyze(title, content).await
    }
}

struct CountingEmbedder {
    inner: HashEmbedder,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text).await
    }
}

async fn enriched_items(store: &Store) -> Vec<Item> {
    store.all_items().await.expect("all items")
}

/// Enrichment chains run detached; poll until every stored item carries
/// an embedding.
async fn wait_until_embedded(store: &Store) {
    for _ in 0..200 {
        let items = enriched_items(store).await;
        if !items.is_empty() && items.iter().all(|i| i.embedding.is_some()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for enrichment to finish");
}

async fn wait_for_connection(store: &Store, item_id: Uuid) {
    for _ in 0..200 {
        let connections = store
            .connections_for_item(item_id)
            .await
            .expect("connections");
        if !connections.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for a connection");
}

#[tokio::test]
async fn subscribe_polls_enriches_and_connects() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let url = serve_feed(FEED_BODY).await;
    let store = Arc::new(Store::open_in_memory().await?);
    let analyzer_calls = Arc::new(AtomicUsize::new(0));
    let embedder_calls = Arc::new(AtomicUsize::new(0));

    let curator = FeedCurator::new(
        Arc::clone(&store),
        Arc::new(CountingAnalyzer {
            inner: HeuristicAnalyzer,
            calls: Arc::clone(&analyzer_calls),
        }),
        Arc::new(CountingEmbedder {
            inner: HashEmbedder::default(),
            calls: Arc::clone(&embedder_calls),
        }),
        CuratorConfig::default(),
    );

    let feed = curator.subscribe(&url).await?;
    info!("subscribed feed {}", feed.id);
    assert_eq!(feed.title.as_deref(), Some("Tech Journal"));
    assert_eq!(feed.item_count, 2);

    let items = enriched_items(&store).await;
    assert_eq!(items.len(), 2);

    // Detached chains finish on their own schedule; wait for both items
    // to carry an embedding.
    wait_until_embedded(&store).await;

    let items = enriched_items(&store).await;
    for item in &items {
        assert!(item.summary.is_some(), "summary populated");
        assert!(item.topics.contains(&"technology".to_string()));
        assert!(!item.entities.is_empty());
        assert!((0.0..=1.0).contains(&item.relevance_score));
    }
    assert_eq!(analyzer_calls.load(Ordering::SeqCst), 2);
    assert_eq!(embedder_calls.load(Ordering::SeqCst), 2);

    // The two articles share topics, so exactly one connection appears
    // once the later chain's connect step lands.
    wait_for_connection(&store, items[0].id).await;
    let connections = store.connections_for_item(items[0].id).await?;
    assert_eq!(connections.len(), 1);
    assert!(connections[0].strength >= 0.3);

    // Fresh, unread, high-scoring items produce notifications; one per
    // item, idempotently.
    let notifications = store.notifications().await?;
    assert_eq!(notifications.len(), 2);
    assert!(!store.create_notification(items[0].id).await?);

    let related = curator.find_related(items[0].id, 5).await?;
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].item.id, items[1].id);

    Ok(())
}

#[tokio::test]
async fn polling_unchanged_document_adds_no_items() -> Result<()> {
    let url = serve_feed(FEED_BODY).await;
    let store = Arc::new(Store::open_in_memory().await?);
    let config = CuratorConfig::default();

    let curator = FeedCurator::new(
        Arc::clone(&store),
        Arc::new(HeuristicAnalyzer),
        Arc::new(HashEmbedder::default()),
        config.clone(),
    );
    let feed = curator.subscribe(&url).await?;
    assert_eq!(feed.item_count, 2);

    // Second poll of the same document: every link is already known.
    let enrichment = Arc::new(EnrichmentPipeline::new(
        Arc::clone(&store),
        Arc::new(HeuristicAnalyzer),
        Arc::new(HashEmbedder::default()),
        &config,
    ));
    let fetcher = ContentFetcher::new(config.fetch.clone(), Arc::clone(&store), enrichment);
    let outcome = fetcher.poll_feed(&store.feed(feed.id).await?).await?;

    assert_eq!(outcome.entries_seen, 2);
    assert_eq!(outcome.new_items, 0);
    assert_eq!(store.all_items().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn re_enrichment_performs_no_collaborator_calls() -> Result<()> {
    let url = serve_feed(FEED_BODY).await;
    let store = Arc::new(Store::open_in_memory().await?);
    let analyzer_calls = Arc::new(AtomicUsize::new(0));
    let embedder_calls = Arc::new(AtomicUsize::new(0));

    let curator = FeedCurator::new(
        Arc::clone(&store),
        Arc::new(CountingAnalyzer {
            inner: HeuristicAnalyzer,
            calls: Arc::clone(&analyzer_calls),
        }),
        Arc::new(CountingEmbedder {
            inner: HashEmbedder::default(),
            calls: Arc::clone(&embedder_calls),
        }),
        CuratorConfig::default(),
    );
    curator.subscribe(&url).await?;

    wait_until_embedded(&store).await;

    let before_analyze = analyzer_calls.load(Ordering::SeqCst);
    let before_embed = embedder_calls.load(Ordering::SeqCst);

    for item in store.all_items().await? {
        curator.re_enrich(item.id).await?;
    }

    assert_eq!(analyzer_calls.load(Ordering::SeqCst), before_analyze);
    assert_eq!(embedder_calls.load(Ordering::SeqCst), before_embed);
    Ok(())
}

#[tokio::test]
async fn subscribing_to_a_bad_url_fails_validation() -> Result<()> {
    let store = Arc::new(Store::open_in_memory().await?);
    let curator = FeedCurator::new(
        Arc::clone(&store),
        Arc::new(HeuristicAnalyzer),
        Arc::new(HashEmbedder::default()),
        CuratorConfig::default(),
    );

    // Unsupported scheme.
    assert!(curator.subscribe("ftp://example.com/feed").await.is_err());
    // Unparseable.
    assert!(curator.subscribe("not a url at all").await.is_err());
    assert!(store.list_feeds().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn unsubscribe_removes_feed_items_and_edges() -> Result<()> {
    let url = serve_feed(FEED_BODY).await;
    let store = Arc::new(Store::open_in_memory().await?);
    let curator = FeedCurator::new(
        Arc::clone(&store),
        Arc::new(HeuristicAnalyzer),
        Arc::new(HashEmbedder::default()),
        CuratorConfig::default(),
    );
    let feed = curator.subscribe(&url).await?;

    wait_until_embedded(&store).await;
    let item_id = store.all_items().await?[0].id;
    // Once the pair's edge exists, no chain can create another one.
    wait_for_connection(&store, item_id).await;

    curator.unsubscribe(feed.id).await?;
    assert!(store.list_feeds().await?.is_empty());
    assert!(store.all_items().await?.is_empty());
    assert!(store.connections_for_item(item_id).await?.is_empty());
    assert!(store.notifications().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_subscription_is_rejected() -> Result<()> {
    let url = serve_feed(FEED_BODY).await;
    let store = Arc::new(Store::open_in_memory().await?);
    let curator = FeedCurator::new(
        Arc::clone(&store),
        Arc::new(HeuristicAnalyzer),
        Arc::new(HashEmbedder::default()),
        CuratorConfig::default(),
    );

    curator.subscribe(&url).await?;
    assert!(curator.subscribe(&url).await.is_err());
    assert_eq!(store.list_feeds().await?.len(), 1);
    Ok(())
}
