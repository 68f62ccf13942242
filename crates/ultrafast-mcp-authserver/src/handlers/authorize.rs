//! `GET`/`POST /authorize` — begins the authorization flow by creating a
//! pending session (§4.5).

use super::base_url;
use crate::crypto::generate_hex_id;
use crate::error::{AuthServerError, AuthServerResult};
use crate::models::{unix_now, AuthSession, AuthorizeParams, OAuthClient};
use crate::server::AuthServer;
use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};

const DEFAULT_SCOPE: &str = "openid portfolio:read tools:invoke";
const SESSION_COOKIE_MAX_AGE_SECS: u64 = 600;

pub async fn authorize_get(
    State(server): State<AuthServer>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    match handle_authorize(&server, &headers, &uri, params, true).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

pub async fn authorize_post(
    State(server): State<AuthServer>,
    headers: HeaderMap,
    uri: Uri,
    Form(params): Form<AuthorizeParams>,
) -> Response {
    match handle_authorize(&server, &headers, &uri, params, false).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn handle_authorize(
    server: &AuthServer,
    headers: &HeaderMap,
    uri: &Uri,
    params: AuthorizeParams,
    is_get: bool,
) -> AuthServerResult<Response> {
    // Sparse GET: the CLI already preflighted a session via POST and opened the
    // browser with only `client_id`. Reuse that pending session rather than
    // demanding the full parameter set again (§4.5).
    if is_get && params.redirect_uri.is_none() {
        if let Some(client_id) = &params.client_id {
            if let Some(session) = server.sessions().get_by_client_id(client_id).await {
                return Ok(redirect_with_cookie(&session.session_id, headers));
            }
        }
    }

    let redirect_uri = params
        .redirect_uri
        .ok_or_else(|| AuthServerError::InvalidRedirectUri("redirect_uri is required".to_string()))?;
    validate_redirect_uri_shape(&redirect_uri)?;

    // Extract the five required parameters together: any absent field redirects
    // with `error=invalid_request` (preserving whatever `state` was supplied, if
    // any) rather than ever unwrapping an attacker-controlled `Option` (§10.2).
    let (client_id, response_type, code_challenge, code_challenge_method, state) = match (
        params.client_id,
        params.response_type,
        params.code_challenge,
        params.code_challenge_method,
        params.state,
    ) {
        (Some(client_id), Some(response_type), Some(code_challenge), Some(code_challenge_method), Some(state)) => {
            (client_id, response_type, code_challenge, code_challenge_method, state)
        }
        (_, _, _, _, state) => {
            return Err(AuthServerError::InvalidRequestRedirect { redirect_uri, state });
        }
    };

    if response_type != "code" {
        return Err(AuthServerError::UnsupportedResponseType { redirect_uri, state: Some(state) });
    }
    if code_challenge_method != "S256" || code_challenge.is_empty() {
        return Err(AuthServerError::InvalidRequestRedirect { redirect_uri, state: Some(state) });
    }

    let client = match server.clients().get(&client_id).await {
        Some(client) => client,
        None => auto_register_loopback_client(server, &client_id, &redirect_uri).await?,
    };

    if !client.redirect_uri_matches(&redirect_uri) {
        return Err(AuthServerError::InvalidRedirectUri(
            "redirect_uri is not registered for this client".to_string(),
        ));
    }

    let scope = params.scope.filter(|s| !s.is_empty()).unwrap_or_else(|| DEFAULT_SCOPE.to_string());

    let session_id = generate_hex_id(16);
    let session = AuthSession {
        session_id: session_id.clone(),
        client_id: client_id.clone(),
        redirect_uri,
        state,
        code_challenge,
        code_challenge_method,
        scope,
        created_at: unix_now(),
        user_id: None,
    };
    server.sessions().put(session).await;
    tracing::info!(client_id = %client_id, "authorization session created");

    if is_get {
        Ok(redirect_with_cookie(&session_id, headers))
    } else {
        Ok(preflight_ok_with_cookie(&session_id, headers))
    }
}

/// Registers a minimal client record for an unknown `client_id`, gated to
/// loopback redirect URIs only (§9 Open Question — decided in DESIGN.md: kept
/// for CLI clients that skip DCR, narrowed to the one deployment shape that
/// leniency exists to serve). A non-loopback host on an unknown `client_id`
/// is rejected the same way an unparseable redirect URI is: 400, no redirect.
async fn auto_register_loopback_client(
    server: &AuthServer,
    client_id: &str,
    redirect_uri: &str,
) -> AuthServerResult<OAuthClient> {
    if !is_loopback_redirect_uri(redirect_uri) {
        return Err(AuthServerError::InvalidRedirectUri(
            "unknown client_id with a non-loopback redirect_uri".to_string(),
        ));
    }
    tracing::warn!(client_id, redirect_uri, "auto-registering client for unknown client_id");
    let client = OAuthClient {
        client_id: client_id.to_string(),
        client_secret: None,
        client_name: "auto-registered client".to_string(),
        redirect_uris: vec![redirect_uri.to_string()],
        grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
        response_types: vec!["code".to_string()],
        token_endpoint_auth_method: "none".to_string(),
        created_at: unix_now(),
    };
    server.clients().put(client.clone()).await;
    Ok(client)
}

fn is_loopback_redirect_uri(redirect_uri: &str) -> bool {
    let Ok(url) = url::Url::parse(redirect_uri) else { return false };
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
        Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

/// A redirect_uri must be a parseable absolute URL with a non-empty host
/// before it is ever redirected to (§4.5 step 1, §9).
fn validate_redirect_uri_shape(redirect_uri: &str) -> AuthServerResult<()> {
    let url = url::Url::parse(redirect_uri)
        .map_err(|_| AuthServerError::InvalidRedirectUri("not a parseable absolute URL".to_string()))?;
    if url.host().is_none() {
        return Err(AuthServerError::InvalidRedirectUri("redirect_uri has no host".to_string()));
    }
    Ok(())
}

fn session_cookie(session_id: &str, headers: &HeaderMap) -> HeaderValue {
    let secure = if base_url(headers, &Uri::from_static("/")).starts_with("https") {
        "; Secure"
    } else {
        ""
    };
    HeaderValue::from_str(&format!(
        "mcp_session_id={session_id}; HttpOnly; SameSite=Lax; Path=/; Max-Age={SESSION_COOKIE_MAX_AGE_SECS}{secure}"
    ))
    .expect("cookie header value built from a hex session id and static text is always valid")
}

fn redirect_with_cookie(session_id: &str, headers: &HeaderMap) -> Response {
    let mut response =
        (StatusCode::FOUND, [(header::LOCATION, format!("/?mcp_session={session_id}"))]).into_response();
    response.headers_mut().insert(header::SET_COOKIE, session_cookie(session_id, headers));
    response
}

fn preflight_ok_with_cookie(session_id: &str, headers: &HeaderMap) -> Response {
    let mut response = (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "session_id": session_id })),
    )
        .into_response();
    response.headers_mut().insert(header::SET_COOKIE, session_cookie(session_id, headers));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_hosts_are_recognized() {
        assert!(is_loopback_redirect_uri("http://localhost:7777/cb"));
        assert!(is_loopback_redirect_uri("http://127.0.0.1:7777/cb"));
        assert!(is_loopback_redirect_uri("http://[::1]:7777/cb"));
        assert!(!is_loopback_redirect_uri("http://example.com/cb"));
    }

    #[test]
    fn redirect_uri_shape_validation() {
        assert!(validate_redirect_uri_shape("http://localhost:7777/cb").is_ok());
        assert!(validate_redirect_uri_shape("not a url").is_err());
        assert!(validate_redirect_uri_shape("mailto:someone@example.com").is_err());
    }
}
