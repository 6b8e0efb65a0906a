pub mod aging;
pub mod config;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod front_page;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod scheduler;
pub mod scorer;
pub mod source;
pub mod store;
pub mod urls;

pub use aging::AgingModel;
pub use config::{FetchConfig, RankingConfig, RerankConfig, ScoringConfig};
pub use dedup::DedupFilter;
pub use error::{ConfigError, FeedError, PipelineError, ProviderError, StoreError};
pub use feed::{fetch_source, ingest_all, IngestOutcome, RawEntry};
pub use front_page::{FrontPage, FrontPageItem};
pub use normalize::{NormalizationBasis, ScoreNormalizer, SiteStatistic, Statistic};
pub use pipeline::{Pipeline, RunReport, SourceFailure};
pub use ranking::{RankedArticle, RankingEngine};
pub use scheduler::{run_once, spawn_periodic, Event, SchedulerHandle};
pub use scorer::{EngagementScorer, ScoreProvider};
pub use source::{LinkKey, Source};
pub use store::{ActiveArticle, LifecycleStore, StoreCounts};
pub use urls::{normalize_url, site_of, top_level};
