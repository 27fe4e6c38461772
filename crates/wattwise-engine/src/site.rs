//! URL host extraction and site classification.

use url::Url;
use wattwise_core::config::ScoringConfig;

use crate::types::SiteType;

const NEWS_DOMAINS: &[&str] = &[
    "cnn.com",
    "bbc.com",
    "bbc.co.uk",
    "nytimes.com",
    "theguardian.com",
    "reuters.com",
    "washingtonpost.com",
    "news.ycombinator.com",
];

const ECOMMERCE_DOMAINS: &[&str] = &[
    "amazon.com",
    "ebay.com",
    "etsy.com",
    "walmart.com",
    "aliexpress.com",
    "bestbuy.com",
];

/// Lowercased host of `url` as a browser would resolve it.
///
/// Returns an empty string for unparseable URLs and URLs without a host
/// (e.g. `about:blank`).
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_default()
}

/// True if `host` is `domain` or one of its subdomains.
pub fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

pub fn matches_any<S: AsRef<str>>(host: &str, domains: &[S]) -> bool {
    domains.iter().any(|d| matches_domain(host, d.as_ref()))
}

/// Site category of `url`, used to predict resource loads.
pub fn classify_site(url: &str, scoring: &ScoringConfig) -> SiteType {
    let host = host_of(url);
    if host.is_empty() {
        return SiteType::General;
    }
    if matches_any(&host, &scoring.entertainment_domains) {
        SiteType::Video
    } else if matches_any(&host, &scoring.social_domains) {
        SiteType::Social
    } else if matches_any(&host, NEWS_DOMAINS) {
        SiteType::News
    } else if matches_any(&host, ECOMMERCE_DOMAINS) {
        SiteType::Ecommerce
    } else {
        SiteType::General
    }
}
