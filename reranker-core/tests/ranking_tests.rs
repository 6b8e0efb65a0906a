use chrono::Utc;
use reranker_core::normalize::volume_penalty;
use reranker_core::{
    ActiveArticle, AgingModel, FrontPage, NormalizationBasis, RankingEngine, ScoreNormalizer,
    Statistic,
};

const FRESH: u64 = 7_200;
const HORIZON: u64 = 86_400;

fn article(id: i64, url: &str, raw_score: u64, age_secs: i64) -> ActiveArticle {
    ActiveArticle {
        id,
        url: url.into(),
        title: format!("Article {id}"),
        raw_score,
        published_at: Utc::now(),
        age_secs,
    }
}

fn engine(
    statistic: Statistic,
    penalty: bool,
    basis: NormalizationBasis,
    count: usize,
) -> RankingEngine {
    RankingEngine::new(
        AgingModel::new(FRESH, HORIZON),
        ScoreNormalizer::new(statistic, penalty),
        basis,
        count,
    )
}

#[test]
fn decay_is_flat_inside_freshness_window() {
    let aging = AgingModel::new(FRESH, HORIZON);
    assert_eq!(aging.decay(0.0), 1.0);
    assert_eq!(aging.decay(7_199.0), 1.0);
}

#[test]
fn decay_declines_after_window_and_goes_negative() {
    let aging = AgingModel::new(FRESH, HORIZON);
    let mut previous = aging.decay(FRESH as f64);
    for age in [7_201.0, 20_000.0, 50_400.0, 86_400.0, 93_600.0, 120_000.0] {
        let current = aging.decay(age);
        assert!(current < previous, "decay must strictly decrease at {age}");
        previous = current;
    }
    assert!((aging.decay(50_400.0) - 0.5).abs() < 1e-12);
    assert_eq!(aging.decay((HORIZON + FRESH) as f64), 0.0);
    assert!(aging.decay((HORIZON + FRESH + 1) as f64) < 0.0);
}

#[test]
fn median_uses_standard_definition() {
    assert_eq!(Statistic::Median.compute(&[1.0, 3.0, 2.0]), Some(2.0));
    assert_eq!(Statistic::Median.compute(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    assert_eq!(Statistic::Median.compute(&[5.0]), Some(5.0));
    assert_eq!(Statistic::Mean.compute(&[]), None);
}

#[test]
fn volume_penalty_is_neutral_for_single_article_sites() {
    assert_eq!(volume_penalty(1), 1.0);
    assert!((volume_penalty(3) - 3f64.ln()).abs() < 1e-12);

    let normalizer = ScoreNormalizer::new(Statistic::Mean, true);
    let stats = normalizer.site_statistics(vec![
        ("solo.com".to_string(), 10.0),
        ("busy.com".to_string(), 10.0),
        ("busy.com".to_string(), 20.0),
        ("busy.com".to_string(), 30.0),
    ]);
    assert_eq!(stats["solo.com"].divisor, 10.0);
    assert_eq!(stats["busy.com"].center, 20.0);
    assert!((stats["busy.com"].divisor - 20.0 * 3f64.ln()).abs() < 1e-9);
    assert_eq!(stats["busy.com"].count, 3);
}

#[test]
fn same_site_articles_are_normalized_by_site_mean() {
    let articles = vec![
        article(1, "http://news.example.com/a", 100, 0),
        article(2, "http://news.example.com/b", 50, 0),
    ];
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Raw, 20).rank(&articles);

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].id, 1);
    assert!((ranked[0].final_score - 100.0 / 75.0).abs() < 1e-9);
    assert!((ranked[1].final_score - 50.0 / 75.0).abs() < 1e-9);
    assert_eq!(format!("{:.3}", ranked[0].final_score), "1.333");
    assert_eq!(format!("{:.3}", ranked[1].final_score), "0.667");
}

#[test]
fn small_site_is_not_drowned_by_large_site() {
    let articles = vec![
        article(1, "http://big.com/1", 10_000, 0),
        article(2, "http://big.com/2", 8_000, 0),
        article(3, "http://small.org/1", 40, 0),
    ];
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Raw, 20).rank(&articles);
    let ids: Vec<i64> = ranked.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3, 2]);
    assert!((ranked[1].final_score - 1.0).abs() < 1e-9);
}

#[test]
fn ties_keep_insertion_order() {
    let articles = vec![
        article(7, "http://a.com/x", 10, 0),
        article(3, "http://b.com/y", 20, 0),
        article(5, "http://c.com/z", 30, 0),
    ];
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Raw, 20).rank(&articles);
    let ids: Vec<i64> = ranked.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![7, 3, 5]);
}

#[test]
fn zero_statistic_site_is_excluded() {
    let articles = vec![
        article(1, "http://quiet.com/a", 0, 0),
        article(2, "http://quiet.com/b", 0, 0),
        article(3, "http://loud.com/a", 12, 0),
    ];
    let ranked = engine(Statistic::Median, false, NormalizationBasis::Raw, 20).rank(&articles);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].id, 3);
    assert_eq!(ranked[0].site, "loud.com");
}

#[test]
fn ranking_truncates_to_front_page_count() {
    let articles: Vec<ActiveArticle> = (1..=5)
        .map(|i| article(i, &format!("http://site{i}.com/a"), 10, 0))
        .collect();
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Raw, 2).rank(&articles);
    assert_eq!(ranked.len(), 2);
}

#[test]
fn old_articles_sink_below_fresh_ones() {
    let articles = vec![
        article(1, "http://a.com/old", 100, 100_000),
        article(2, "http://b.com/new", 100, 60),
    ];
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Raw, 20).rank(&articles);
    assert_eq!(ranked[0].id, 2);
    assert!(ranked[1].final_score < 0.0);
}

#[test]
fn normalization_basis_controls_statistic_input() {
    let articles = vec![
        article(1, "http://site.com/new", 100, 0),
        article(2, "http://site.com/older", 100, 50_400),
    ];

    let raw = engine(Statistic::Mean, false, NormalizationBasis::Raw, 20).rank(&articles);
    assert!((raw[0].final_score - 1.0).abs() < 1e-9);
    assert!((raw[1].final_score - 0.5).abs() < 1e-9);

    let decayed = engine(Statistic::Mean, false, NormalizationBasis::Decayed, 20).rank(&articles);
    assert!((decayed[0].final_score - 100.0 / 75.0).abs() < 1e-9);
    assert!((decayed[1].final_score - 50.0 / 75.0).abs() < 1e-9);
}

#[test]
fn decayed_basis_never_lifts_stale_articles_above_fresh_ones() {
    let articles = vec![
        article(1, "http://fresh.com/a", 100, 0),
        article(2, "http://fresh.com/b", 300, 0),
        article(3, "http://stale.com/x", 100, 200_000),
    ];
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Decayed, 20).rank(&articles);
    let ids: Vec<i64> = ranked.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert!((ranked[0].final_score - 1.5).abs() < 1e-9);
    assert!((ranked[1].final_score - 0.5).abs() < 1e-9);
}

#[test]
fn decayed_basis_keeps_stale_article_of_live_site_at_bottom() {
    let articles = vec![
        article(1, "http://site.com/new", 100, 0),
        article(2, "http://site.com/stale", 100, 200_000),
        article(3, "http://other.com/a", 10, 0),
    ];
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Decayed, 20).rank(&articles);
    let ids: Vec<i64> = ranked.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3, 2]);
    assert!((ranked[0].final_score - 2.0).abs() < 1e-9);
    assert!(ranked[2].decay < 0.0);
    assert!(ranked[2].final_score < 0.0);
}

#[test]
fn front_page_resolves_site_names_and_relative_scores() {
    let articles = vec![
        article(
            1,
            "http://well.blogs.nytimes.com/a-very-long-path-that-goes-on-and-on-and-on",
            30,
            0,
        ),
        article(2, "http://www.nytimes.com/b", 10, 0),
        article(3, "http://unmapped.org/c", 5, 0),
    ];
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Raw, 20).rank(&articles);
    let names = [("nytimes.com".to_string(), "The New York Times".to_string())]
        .into_iter()
        .collect();
    let page = FrontPage::build(&ranked, &names, Utc::now());

    assert_eq!(page.items[0].rank, 1);
    assert_eq!(page.items[0].site, "The New York Times");
    assert_eq!(page.items[0].score, "1.5000");
    assert_eq!(page.items[0].percent, 100.0);
    assert!(page.items[0].short_url.ends_with("..."));
    let unmapped = page.items.iter().find(|i| i.url.contains("unmapped")).unwrap();
    assert_eq!(unmapped.site, "unmapped.org");
}

#[test]
fn front_page_percent_is_zero_without_positive_top_score() {
    let articles = vec![article(1, "http://a.com/x", 10, 200_000)];
    let ranked = engine(Statistic::Mean, false, NormalizationBasis::Raw, 20).rank(&articles);
    let page = FrontPage::build(&ranked, &Default::default(), Utc::now());
    assert!(ranked[0].final_score < 0.0);
    assert_eq!(page.items[0].percent, 0.0);
}
