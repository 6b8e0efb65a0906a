use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::FetchConfig;
use crate::error::FeedError;
use crate::source::{LinkKey, Source};

/// One feed item reduced to what the reranker stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEntry {
    pub link: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
}

/// Result of ingesting a single source during a run.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub source: Source,
    pub entries: Vec<RawEntry>,
    pub error: Option<String>,
}

impl RawEntry {
    pub fn from_rss_item(
        item: &rss::Item,
        key: &LinkKey,
        fetched_at: DateTime<Utc>,
    ) -> Option<Self> {
        let link = rss_link(item, key).or_else(|| rss_link(item, &key.fallback()))?;

        let published_at = item
            .pub_date()
            .and_then(parse_timestamp)
            .or_else(|| {
                item.dublin_core_ext()
                    .and_then(|dc| dc.dates().first().and_then(|value| parse_timestamp(value)))
            })
            .unwrap_or(fetched_at);

        Some(Self {
            link,
            title: item.title().unwrap_or_default().trim().to_owned(),
            published_at,
        })
    }

    pub fn from_atom_entry(
        entry: &atom_syndication::Entry,
        key: &LinkKey,
        fetched_at: DateTime<Utc>,
    ) -> Option<Self> {
        let link = atom_link(entry, key).or_else(|| atom_link(entry, &key.fallback()))?;

        let published_at = entry
            .published()
            .copied()
            .unwrap_or_else(|| *entry.updated())
            .with_timezone(&Utc);
        // A missing <updated> parses as the epoch.
        let published_at = if published_at.timestamp() == 0 {
            fetched_at
        } else {
            published_at
        };

        Some(Self {
            link,
            title: entry.title().value.trim().to_owned(),
            published_at,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn rss_link(item: &rss::Item, key: &LinkKey) -> Option<String> {
    match key {
        LinkKey::Link => item.link().and_then(non_empty),
        LinkKey::Guid => item.guid().and_then(|guid| non_empty(guid.value())),
        LinkKey::Extension { prefix, name } => item
            .extensions()
            .get(prefix)
            .and_then(|by_name| by_name.get(name))
            .and_then(|values| values.iter().find_map(|ext| ext.value().and_then(non_empty))),
    }
}

fn atom_link(entry: &atom_syndication::Entry, key: &LinkKey) -> Option<String> {
    match key {
        LinkKey::Link => entry
            .links()
            .iter()
            .find(|link| link.rel() == "alternate")
            .or_else(|| entry.links().first())
            .and_then(|link| non_empty(link.href())),
        LinkKey::Guid => non_empty(entry.id()),
        LinkKey::Extension { prefix, name } => entry
            .extensions()
            .get(prefix)
            .and_then(|by_name| by_name.get(name))
            .and_then(|values| values.iter().find_map(|ext| ext.value().and_then(non_empty))),
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses an RSS document, falling back to Atom.
pub fn parse_document(
    body: &Bytes,
    key: &LinkKey,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<RawEntry>, FeedError> {
    let rss_err = match rss::Channel::read_from(Cursor::new(body.as_ref())) {
        Ok(channel) => {
            return Ok(channel
                .items()
                .iter()
                .filter_map(|item| {
                    let entry = RawEntry::from_rss_item(item, key, fetched_at);
                    if entry.is_none() {
                        debug!(title = ?item.title(), "skipping item without link");
                    }
                    entry
                })
                .collect())
        }
        Err(err) => err,
    };

    match atom_syndication::Feed::read_from(Cursor::new(body.as_ref())) {
        Ok(feed) => Ok(feed
            .entries()
            .iter()
            .filter_map(|entry| {
                let raw = RawEntry::from_atom_entry(entry, key, fetched_at);
                if raw.is_none() {
                    debug!(id = entry.id(), "skipping entry without link");
                }
                raw
            })
            .collect()),
        Err(atom) => Err(FeedError::Parse { rss: rss_err, atom }),
    }
}

async fn fetch_body(
    client: &Client,
    source: &Source,
    config: &FetchConfig,
) -> Result<Bytes, FeedError> {
    let response = client
        .get(&source.feed_endpoint)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status));
    }
    Ok(response.bytes().await?)
}

/// Fetches and parses one source, retrying transient failures.
pub async fn fetch_source(
    client: &Client,
    source: &Source,
    config: &FetchConfig,
) -> Result<Vec<RawEntry>, FeedError> {
    let mut attempt: u32 = 0;
    let body = loop {
        match fetch_body(client, source, config).await {
            Ok(body) => break body,
            Err(err) if attempt < config.max_retries => {
                attempt += 1;
                let backoff = Duration::from_millis(config.retry_backoff_ms * u64::from(attempt));
                debug!(feed = %source.feed_endpoint, attempt, error = %err, "retrying feed fetch");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    };

    parse_document(&body, &source.link_key, Utc::now())
}

/// Ingests every source; a failing source contributes nothing and is reported.
pub async fn ingest_all(
    client: &Client,
    sources: &[Source],
    config: &FetchConfig,
) -> Vec<IngestOutcome> {
    let mut outcomes = Vec::with_capacity(sources.len());
    for source in sources {
        let outcome = match fetch_source(client, source, config).await {
            Ok(entries) => {
                info!(feed = %source.display_name, entries = entries.len(), "fetched feed");
                IngestOutcome {
                    source: source.clone(),
                    entries,
                    error: None,
                }
            }
            Err(err) => {
                warn!(feed = %source.feed_endpoint, error = %err, "failed to fetch feed");
                IngestOutcome {
                    source: source.clone(),
                    entries: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}
