//! HTTP handlers, one module per endpoint family of §6.

pub mod authorize;
pub mod discovery;
pub mod register;
pub mod token;

use axum::http::{HeaderMap, Uri};

/// Derives the request's base URL (scheme + host, no trailing slash) from
/// `Host`/`X-Forwarded-Proto` rather than any static config value, so issuer
/// and endpoint URLs stay correct behind a reverse proxy (§4.3, §9).
pub(crate) fn base_url(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = if uri.scheme_str() == Some("https")
        || headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("https"))
    {
        "https"
    } else {
        "http"
    };
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn plain_http_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::HOST, HeaderValue::from_static("localhost:8080"));
        assert_eq!(base_url(&headers, &Uri::from_static("/")), "http://localhost:8080");
    }

    #[test]
    fn forwarded_proto_upgrades_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::HOST, HeaderValue::from_static("portal.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(base_url(&headers, &Uri::from_static("/")), "https://portal.example.com");
    }
}
