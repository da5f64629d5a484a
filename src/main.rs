use clap::Parser;
use feed_curator::{CuratorConfig, FeedCurator, HashEmbedder, HeuristicAnalyzer, Store};
use std::env;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "feed-curator", about = "Personalized feed polling and enrichment pipeline")]
struct Cli {
    /// SQLite database URL; falls back to $DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Feed URLs to subscribe to before starting
    #[arg(long = "subscribe", value_name = "URL")]
    subscribe: Vec<String>,

    /// Run one poll pass and exit instead of looping
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let database_url = cli
        .database_url
        .or_else(|| env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite:feed_curator.db".to_string());

    info!("opening database {database_url}");
    let store = Arc::new(Store::open(&database_url).await?);
    let curator = FeedCurator::new(
        store,
        Arc::new(HeuristicAnalyzer),
        Arc::new(HashEmbedder::default()),
        CuratorConfig::default(),
    );

    for url in &cli.subscribe {
        match curator.subscribe(url).await {
            Ok(feed) => info!("subscribed {} ({})", feed.url, feed.id),
            Err(e) => error!("failed to subscribe {url}: {e}"),
        }
    }

    if cli.once {
        let summary = curator.poll_all().await?;
        info!(
            "poll pass complete: {} polled, {} ok, {} failed, {} new items",
            summary.polled, summary.succeeded, summary.failed, summary.new_items
        );
    } else {
        curator.run().await;
    }

    Ok(())
}
