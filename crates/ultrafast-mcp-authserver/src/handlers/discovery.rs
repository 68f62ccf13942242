//! `/.well-known/oauth-authorization-server` and `/.well-known/oauth-protected-resource`
//! (RFC 8414 / RFC 9728), §4.3.

use super::base_url;
use crate::server::AuthServer;
use axum::{
    extract::State,
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

const SCOPES: [&str; 4] = ["openid", "portfolio:read", "portfolio:write", "tools:invoke"];

pub async fn authorization_server_metadata(
    State(_server): State<AuthServer>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let base = base_url(&headers, &uri);
    let body = json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/authorize"),
        "token_endpoint": format!("{base}/token"),
        "registration_endpoint": format!("{base}/register"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["client_secret_post", "none"],
        "scopes_supported": SCOPES,
    });
    cached_json(body)
}

pub async fn protected_resource_metadata(
    State(_server): State<AuthServer>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let base = base_url(&headers, &uri);
    let body = json!({
        "resource": base,
        "authorization_servers": [base],
        "scopes_supported": ["openid", "portfolio:read", "tools:invoke"],
        "bearer_methods_supported": ["header"],
    });
    cached_json(body)
}

fn cached_json(body: serde_json::Value) -> Response {
    let mut response = Json(body).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, "public, max-age=3600".parse().unwrap());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_resource_scopes_are_a_subset_of_authorization_server_scopes() {
        let protected = ["openid", "portfolio:read", "tools:invoke"];
        assert!(protected.iter().all(|s| SCOPES.contains(s)));
    }
}
