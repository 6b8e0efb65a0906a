//! URL helpers shared by the dedup filter, the scorer and the normalizer.
//!
//! Providers and the store key on exact strings, so every component must
//! derive its key through [`normalize_url`].

use url::Url;

/// Strips the fragment, defaults the scheme to `http://` and lower-cases.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    let lowered = without_fragment.to_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        lowered
    } else {
        format!("http://{lowered}")
    }
}

/// Keeps the rightmost two labels of a host when it has at least two dots.
///
/// `well.blogs.nytimes.com` becomes `nytimes.com`; `nytimes.com` and
/// `localhost` are returned unchanged.
pub fn top_level(host: &str) -> String {
    let dots: Vec<usize> = host.match_indices('.').map(|(idx, _)| idx).collect();
    if dots.len() >= 2 {
        host[dots[dots.len() - 2] + 1..].to_owned()
    } else {
        host.to_owned()
    }
}

/// Host of `url` reduced with [`top_level`], or an empty string when the
/// link has no host at all.
pub fn site_of(url: &str) -> String {
    Url::parse(&normalize_url(url))
        .ok()
        .and_then(|parsed| parsed.host_str().map(top_level))
        .unwrap_or_default()
}

/// Truncates a link for display, appending `...` when cut.
pub fn shorten_url(url: &str, max_chars: usize) -> String {
    if url.chars().count() > max_chars {
        let head: String = url.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        url.to_owned()
    }
}
