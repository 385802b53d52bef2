//! CORS policy for the frontend allow-list.
//!
//! Credentials are allowed, so origins, methods and headers can never be the
//! `*` wildcard; methods and headers mirror the preflight instead.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::http::request::Parts;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// One allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPattern {
    /// Full origin, e.g. `http://localhost:5173`.
    Exact(String),
    /// `scheme://*.domain`: any subdomain of `domain` over `scheme`.
    Subdomain { scheme: String, domain: String },
}

impl OriginPattern {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_end_matches('/');
        if let Some((scheme, host)) = raw.split_once("://")
            && let Some(domain) = host.strip_prefix("*.")
        {
            return OriginPattern::Subdomain {
                scheme: scheme.to_ascii_lowercase(),
                domain: domain.to_ascii_lowercase(),
            };
        }
        OriginPattern::Exact(raw.to_ascii_lowercase())
    }

    pub fn matches(&self, origin: &str) -> bool {
        let origin = origin.to_ascii_lowercase();
        match self {
            OriginPattern::Exact(expected) => origin == *expected,
            OriginPattern::Subdomain { scheme, domain } => {
                let Some(host) = origin
                    .strip_prefix(scheme.as_str())
                    .and_then(|rest| rest.strip_prefix("://"))
                else {
                    return false;
                };
                let Some(label) = host
                    .strip_suffix(domain.as_str())
                    .and_then(|rest| rest.strip_suffix('.'))
                else {
                    return false;
                };
                !label.is_empty() && !label.contains(['/', ':', '@'])
            }
        }
    }
}

/// Whether `origin` is on the allow-list.
pub fn origin_allowed(patterns: &[OriginPattern], origin: &str) -> bool {
    patterns.iter().any(|p| p.matches(origin))
}

/// Build the CORS layer for the configured allow-list.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let patterns: Arc<[OriginPattern]> = allowed_origins
        .iter()
        .map(|o| OriginPattern::parse(o))
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| origin_allowed(&patterns, origin))
            },
        ))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
