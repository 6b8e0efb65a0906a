use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::aging::AgingModel;
use crate::config::RerankConfig;
use crate::normalize::{NormalizationBasis, ScoreNormalizer};
use crate::store::ActiveArticle;
use crate::urls::site_of;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedArticle {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub site: String,
    pub raw_score: u64,
    pub age_secs: i64,
    pub decay: f64,
    pub final_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingEngine {
    pub aging: AgingModel,
    pub normalizer: ScoreNormalizer,
    pub basis: NormalizationBasis,
    pub front_page_count: usize,
}

impl RankingEngine {
    pub fn new(
        aging: AgingModel,
        normalizer: ScoreNormalizer,
        basis: NormalizationBasis,
        front_page_count: usize,
    ) -> Self {
        Self {
            aging,
            normalizer,
            basis,
            front_page_count,
        }
    }

    pub fn from_config(config: &RerankConfig) -> Self {
        Self::new(
            AgingModel::from_config(config),
            ScoreNormalizer::from_config(&config.ranking),
            config.ranking.basis,
            config.front_page_count,
        )
    }

    /// Scores, orders and truncates the active set.
    ///
    /// `final = raw * decay(age) / site divisor`; ties keep input order.
    /// Decayed samples are floored at zero before the site statistic is taken.
    /// Articles of a site whose divisor is not positive and finite are left out.
    pub fn rank(&self, articles: &[ActiveArticle]) -> Vec<RankedArticle> {
        let prepared: Vec<(&ActiveArticle, String, f64)> = articles
            .iter()
            .map(|article| {
                let decay = self.aging.decay(article.age_secs as f64);
                (article, site_of(&article.url), decay)
            })
            .collect();

        let samples = prepared.iter().map(|(article, site, decay)| {
            let raw = article.raw_score as f64;
            let value = match self.basis {
                NormalizationBasis::Raw => raw,
                NormalizationBasis::Decayed => (raw * decay).max(0.0),
            };
            (site.clone(), value)
        });
        let stats = self.normalizer.site_statistics(samples);

        let mut excluded: HashSet<&str> = HashSet::new();
        let mut ranked: Vec<RankedArticle> = Vec::with_capacity(prepared.len());
        for (article, site, decay) in &prepared {
            let stat = stats.get(site);
            let divisor = stat.map(|stat| stat.divisor).unwrap_or(0.0);
            if !(divisor > 0.0 && divisor.is_finite()) {
                if excluded.insert(site.as_str()) {
                    warn!(
                        site = %site,
                        count = stat.map(|stat| stat.count).unwrap_or(0),
                        center = stat.map(|stat| stat.center).unwrap_or(0.0),
                        divisor,
                        "site statistic unusable, excluding its articles"
                    );
                }
                continue;
            }
            ranked.push(RankedArticle {
                id: article.id,
                url: article.url.clone(),
                title: article.title.clone(),
                site: site.clone(),
                raw_score: article.raw_score,
                age_secs: article.age_secs,
                decay: *decay,
                final_score: article.raw_score as f64 * decay / divisor,
            });
        }

        // sort_by is stable
        ranked.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        ranked.truncate(self.front_page_count);
        ranked
    }
}
