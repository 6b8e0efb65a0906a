use std::time::Duration;

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ScoringConfig;
use crate::error::ProviderError;
use crate::urls::normalize_url;

/// An external engagement counter queried by normalized URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreProvider {
    /// `GET <endpoint>/<url>`, count in `shares`.
    FacebookLike { endpoint: String },
    /// `GET <endpoint>?url=<url>`, count in `count`.
    TwitterShare { endpoint: String },
}

impl ScoreProvider {
    pub fn name(&self) -> &'static str {
        match self {
            ScoreProvider::FacebookLike { .. } => "facebook",
            ScoreProvider::TwitterShare { .. } => "twitter",
        }
    }

    fn count_field(&self) -> &'static str {
        match self {
            ScoreProvider::FacebookLike { .. } => "shares",
            ScoreProvider::TwitterShare { .. } => "count",
        }
    }

    fn request_url(&self, normalized: &str) -> Result<Url, ProviderError> {
        match self {
            ScoreProvider::FacebookLike { endpoint } => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(normalized.as_bytes()).collect();
                Ok(Url::parse(&format!("{}/{}", endpoint.trim_end_matches('/'), encoded))?)
            }
            ScoreProvider::TwitterShare { endpoint } => {
                Ok(Url::parse_with_params(endpoint, &[("url", normalized)])?)
            }
        }
    }

    /// Queries the provider for an already-normalized URL.
    pub async fn query(
        &self,
        client: &Client,
        normalized: &str,
        timeout: Duration,
    ) -> Result<u64, ProviderError> {
        let url = self.request_url(normalized)?;
        let response = tokio::time::timeout(timeout, client.get(url).timeout(timeout).send())
            .await
            .map_err(|_| ProviderError::Timeout)??;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }
        let body = tokio::time::timeout(timeout, response.bytes())
            .await
            .map_err(|_| ProviderError::Timeout)??;
        let json: Value = serde_json::from_slice(&body)?;
        Ok(extract_count(&json, self.count_field()))
    }
}

/// Reads a non-negative count; an absent or non-numeric field is 0.
fn extract_count(json: &Value, field: &str) -> u64 {
    match json.get(field) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|v| v.max(0) as u64))
            .or_else(|| n.as_f64().map(|v| v.max(0.0) as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

pub struct EngagementScorer {
    client: Client,
    providers: Vec<ScoreProvider>,
    timeout: Duration,
    max_concurrency: usize,
}

impl EngagementScorer {
    pub fn new(
        client: Client,
        providers: Vec<ScoreProvider>,
        timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            client,
            providers,
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn from_config(client: Client, config: &ScoringConfig) -> Self {
        Self::new(
            client,
            vec![
                ScoreProvider::FacebookLike {
                    endpoint: config.facebook_endpoint.clone(),
                },
                ScoreProvider::TwitterShare {
                    endpoint: config.twitter_endpoint.clone(),
                },
            ],
            Duration::from_secs(config.request_timeout_secs),
            config.max_concurrency,
        )
    }

    async fn query_or_zero(&self, provider: &ScoreProvider, normalized: &str) -> u64 {
        match provider.query(&self.client, normalized, self.timeout).await {
            Ok(count) => count,
            Err(err) => {
                debug!(
                    provider = provider.name(),
                    url = normalized,
                    error = %err,
                    "provider failed, counting 0"
                );
                0
            }
        }
    }

    /// Sum of all provider counts for `url`. Never fails.
    pub async fn score(&self, url: &str) -> u64 {
        let normalized = normalize_url(url);
        join_all(self.providers.iter().map(|provider| self.query_or_zero(provider, &normalized)))
            .await
            .into_iter()
            .fold(0u64, u64::saturating_add)
    }

    /// Scores many URLs with at most `max_concurrency` in flight.
    ///
    /// Results come back in completion order, paired with their keys.
    pub async fn score_all<K>(&self, items: Vec<(K, String)>) -> Vec<(K, u64)> {
        stream::iter(items)
            .map(|(key, url)| async move {
                let score = self.score(&url).await;
                (key, score)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await
    }
}
