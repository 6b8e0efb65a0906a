//! Per-site normalization of engagement scores.
//!
//! Sites differ wildly in audience size, so an article's score is divided by a
//! central statistic of its own site's scores before sites are compared.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::RankingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Median,
}

/// Which scores the per-site statistic is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationBasis {
    /// Raw engagement counts.
    #[default]
    Raw,
    /// Counts already multiplied by the age decay.
    Decayed,
}

impl Statistic {
    /// `None` for an empty sample.
    pub fn compute(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Statistic::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Statistic::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 1 {
                    Some(sorted[mid])
                } else {
                    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
                }
            }
        }
    }
}

/// `ln(count)`, with a single article counted as no penalty.
pub fn volume_penalty(count: usize) -> f64 {
    if count <= 1 {
        1.0
    } else {
        (count as f64).ln()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteStatistic {
    pub site: String,
    pub count: usize,
    /// Mean or median before any penalty.
    pub center: f64,
    /// What scores are divided by.
    pub divisor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreNormalizer {
    pub statistic: Statistic,
    pub volume_penalty: bool,
}

impl ScoreNormalizer {
    pub fn new(statistic: Statistic, volume_penalty: bool) -> Self {
        Self {
            statistic,
            volume_penalty,
        }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(config.statistic, config.volume_penalty)
    }

    /// Groups `(site, score)` samples by site and computes each divisor.
    pub fn site_statistics<I>(&self, samples: I) -> HashMap<String, SiteStatistic>
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut by_site: HashMap<String, Vec<f64>> = HashMap::new();
        for (site, score) in samples {
            by_site.entry(site).or_default().push(score);
        }

        by_site
            .into_iter()
            .filter_map(|(site, scores)| {
                let center = self.statistic.compute(&scores)?;
                let divisor = if self.volume_penalty {
                    center * volume_penalty(scores.len())
                } else {
                    center
                };
                Some((
                    site.clone(),
                    SiteStatistic {
                        site,
                        count: scores.len(),
                        center,
                        divisor,
                    },
                ))
            })
            .collect()
    }
}
