pub mod analysis;
pub mod config;
pub mod connections;
pub mod curator;
pub mod enrichment;
pub mod fetcher;
pub mod learner;
pub mod notify;
pub mod parser;
pub mod scheduler;
pub mod scoring;
pub mod store;
pub mod types;

pub use analysis::{Analysis, Analyzer, Embedder, HashEmbedder, HeuristicAnalyzer};
pub use config::{CuratorConfig, FetchConfig};
pub use connections::RelatedItem;
pub use curator::FeedCurator;
pub use enrichment::EnrichmentPipeline;
pub use fetcher::ContentFetcher;
pub use learner::FeedbackLearner;
pub use scheduler::{FeedScheduler, PollSummary};
pub use store::Store;
pub use types::*;
