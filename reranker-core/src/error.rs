use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("feed responded with HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("document is neither RSS ({rss}) nor Atom ({atom})")]
    Parse {
        rss: rss::Error,
        atom: atom_syndication::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider responded with HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed provider response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("provider timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database path error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("scheduler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
