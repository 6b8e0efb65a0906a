use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::normalize::{NormalizationBasis, Statistic};
use crate::source::Source;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Age in seconds after which an article is swept to the dead partition.
    pub expiration_horizon_secs: u64,
    /// Age in seconds below which no decay applies.
    pub freshness_window_secs: u64,
    pub front_page_count: usize,
    pub database_path: PathBuf,
    pub run_interval_minutes: u64,
    pub sources: Vec<Source>,
    /// Top-level domain -> display name.
    pub site_names: BTreeMap<String, String>,
    pub fetch: FetchConfig,
    pub scoring: ScoringConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub facebook_endpoint: String,
    pub twitter_endpoint: String,
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub statistic: Statistic,
    pub volume_penalty: bool,
    pub basis: NormalizationBasis,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            expiration_horizon_secs: 86_400,
            freshness_window_secs: 7_200,
            front_page_count: 20,
            database_path: default_database_path(),
            run_interval_minutes: 60,
            sources: Vec::new(),
            site_names: BTreeMap::new(),
            fetch: FetchConfig::default(),
            scoring: ScoringConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            facebook_endpoint: "http://graph.facebook.com".to_string(),
            twitter_endpoint: "http://urls.api.twitter.com/1/urls/count.json".to_string(),
            request_timeout_secs: 5,
            max_concurrency: 8,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            statistic: Statistic::Mean,
            volume_penalty: false,
            basis: NormalizationBasis::Raw,
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("reranker").join("reranker.db"))
        .unwrap_or_else(|| PathBuf::from("reranker.db"))
}

impl RerankConfig {
    /// Path of the configuration file: `<config dir>/reranker/config.json`.
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        let app_config_dir = config_dir.join("reranker");
        std::fs::create_dir_all(&app_config_dir)?;
        Ok(app_config_dir.join("config.json"))
    }

    /// Loads the default configuration file, or writes and returns defaults.
    pub fn load() -> Self {
        let loaded = Self::config_file_path().and_then(|path| Self::load_from(&path));
        match loaded {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "could not load configuration, using defaults");
                let default_config = Self::default();
                let saved = Self::config_file_path().and_then(|path| default_config.save_to(&path));
                if let Err(save_err) = saved {
                    warn!(error = %save_err, "could not save default configuration");
                }
                default_config
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: RerankConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        // Atomic write
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expiration_horizon_secs == 0 {
            return Err(ConfigError::Invalid("expiration_horizon_secs must be positive".into()));
        }
        if self.front_page_count == 0 {
            return Err(ConfigError::Invalid("front_page_count must be positive".into()));
        }
        if self.scoring.max_concurrency == 0 {
            return Err(ConfigError::Invalid("scoring.max_concurrency must be positive".into()));
        }
        Ok(())
    }
}
