//! Security headers middleware for HTTP responses.
//!
//! Adds the usual hardening headers to every response and keeps rendered
//! pages, which carry per-user content, out of shared caches.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::{AppConfig, SecurityConfig};

/// Sent on every response.
const BASELINE: [(&str, &str); 6] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "same-origin"),
    // geolocation stays allowed for the map
    ("permissions-policy", "microphone=(), camera=()"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
];

fn hsts_value(sec: &SecurityConfig) -> Option<HeaderValue> {
    if !sec.enable_hsts.unwrap_or(false) {
        return None;
    }
    let mut value = format!("max-age={}", sec.hsts_max_age.unwrap_or(31_536_000));
    if sec.hsts_include_subdomains.unwrap_or(false) {
        value.push_str("; includeSubDomains");
    }
    HeaderValue::from_str(&value).ok()
}

fn csp_value(sec: &SecurityConfig) -> Option<HeaderValue> {
    let csp = sec.csp.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
    match HeaderValue::from_str(csp) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Invalid security.csp, header skipped: {}", e);
            None
        }
    }
}

/// Adds the [`BASELINE`] headers plus HSTS and CSP from the `[security]`
/// section. HTML responses also get `Cache-Control: no-store`.
pub async fn security_headers_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    for (name, value) in BASELINE {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    if let Some(sec) = cfg.security.as_ref() {
        if let Some(v) = hsts_value(sec) {
            headers.insert(HeaderName::from_static("strict-transport-security"), v);
        }
        if let Some(v) = csp_value(sec) {
            headers.insert(HeaderName::from_static("content-security-policy"), v);
        }
    }

    let is_html = headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|s| s.starts_with("text/html"));
    if is_html {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsts_value() {
        let mut sec = SecurityConfig::default();
        assert!(hsts_value(&sec).is_none());
        sec.enable_hsts = Some(true);
        sec.hsts_include_subdomains = Some(true);
        assert_eq!(hsts_value(&sec).unwrap(), "max-age=31536000; includeSubDomains");
    }

    #[test]
    fn test_blank_csp_is_skipped() {
        let sec = SecurityConfig { csp: Some("   ".into()), ..Default::default() };
        assert!(csp_value(&sec).is_none());
    }
}
