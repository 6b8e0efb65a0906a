use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ranking::RankedArticle;
use crate::urls::shorten_url;

const SHORT_URL_CHARS: usize = 50;

/// One row handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontPageItem {
    pub rank: usize,
    pub url: String,
    pub short_url: String,
    pub title: String,
    /// Title with spaces as `+`, for search and comment widgets.
    pub query_title: String,
    pub site: String,
    pub score: String,
    /// Share of the top score, 0 to 100.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontPage {
    pub generated_at: DateTime<Utc>,
    pub items: Vec<FrontPageItem>,
}

impl FrontPage {
    /// Builds the page from an already ordered list.
    ///
    /// Site names come from `site_names` keyed by top-level domain and fall
    /// back to the domain itself.
    pub fn build(
        ranked: &[RankedArticle],
        site_names: &BTreeMap<String, String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let top = ranked.first().map(|article| article.final_score).unwrap_or(0.0);
        let items = ranked
            .iter()
            .enumerate()
            .map(|(idx, article)| {
                let percent = if top > 0.0 {
                    (article.final_score / top * 100.0).clamp(0.0, 100.0)
                } else {
                    0.0
                };
                FrontPageItem {
                    rank: idx + 1,
                    url: article.url.clone(),
                    short_url: shorten_url(&article.url, SHORT_URL_CHARS),
                    title: article.title.clone(),
                    query_title: article.title.replace(' ', "+"),
                    site: site_names
                        .get(&article.site)
                        .cloned()
                        .unwrap_or_else(|| article.site.clone()),
                    score: format!("{:.4}", article.final_score),
                    percent,
                }
            })
            .collect();

        Self { generated_at, items }
    }
}
