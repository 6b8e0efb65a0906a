use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::RerankConfig;
use crate::dedup::DedupFilter;
use crate::error::PipelineError;
use crate::feed::ingest_all;
use crate::front_page::FrontPage;
use crate::ranking::{RankedArticle, RankingEngine};
use crate::scorer::EngagementScorer;
use crate::store::LifecycleStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub endpoint: String,
    pub error: String,
}

/// Counters for one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub fetched: usize,
    pub inserted: usize,
    pub expired: u64,
    pub scored: usize,
    pub failed_sources: Vec<SourceFailure>,
}

pub struct Pipeline {
    config: RerankConfig,
    client: Client,
    store: LifecycleStore,
    scorer: EngagementScorer,
    engine: RankingEngine,
}

impl Pipeline {
    pub fn new(config: RerankConfig, client: Client, store: LifecycleStore) -> Self {
        let scorer = EngagementScorer::from_config(client.clone(), &config.scoring);
        let engine = RankingEngine::from_config(&config);
        Self {
            config,
            client,
            store,
            scorer,
            engine,
        }
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    pub fn store(&self) -> &LifecycleStore {
        &self.store
    }

    /// Fetches feeds, stores unseen articles, expires old ones and refreshes
    /// the score of everything still active.
    ///
    /// Feed and provider failures degrade the run; store failures abort it.
    pub async fn ingest(&self, now: DateTime<Utc>) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::default();

        let outcomes = ingest_all(&self.client, &self.config.sources, &self.config.fetch).await;
        let mut candidates = Vec::new();
        for outcome in outcomes {
            if let Some(error) = outcome.error {
                report.failed_sources.push(SourceFailure {
                    source: outcome.source.display_name,
                    endpoint: outcome.source.feed_endpoint,
                    error,
                });
            }
            report.fetched += outcome.entries.len();
            candidates.extend(outcome.entries);
        }

        let fresh = DedupFilter::new(&self.store).filter_new(candidates).await?;
        report.inserted = self.store.insert_new(&fresh).await?.len();

        report.expired = self.store.sweep(now, self.config.expiration_horizon_secs).await?;

        let active = self.store.list_active(now).await?;
        let scores = self
            .scorer
            .score_all(active.into_iter().map(|article| (article.id, article.url)).collect())
            .await;
        report.scored = scores.len();
        self.store.update_scores(&scores).await?;

        info!(
            fetched = report.fetched,
            inserted = report.inserted,
            expired = report.expired,
            scored = report.scored,
            failed_sources = report.failed_sources.len(),
            "ingestion pass complete"
        );
        Ok(report)
    }

    /// Ranks the active set as of `now`.
    pub async fn rank(&self, now: DateTime<Utc>) -> Result<Vec<RankedArticle>, PipelineError> {
        let active = self.store.list_active(now).await?;
        let ranked = self.engine.rank(&active);
        info!(active = active.len(), ranked = ranked.len(), "ranking pass complete");
        Ok(ranked)
    }

    pub async fn front_page(&self, now: DateTime<Utc>) -> Result<FrontPage, PipelineError> {
        let ranked = self.rank(now).await?;
        Ok(FrontPage::build(&ranked, &self.config.site_names, now))
    }

    /// `ingest` then `front_page`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<(RunReport, FrontPage), PipelineError> {
        let report = self.ingest(now).await?;
        let page = self.front_page(now).await?;
        Ok((report, page))
    }
}
