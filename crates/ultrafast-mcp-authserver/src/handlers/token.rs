//! `POST /token` — authorization_code and refresh_token grants (§4.7).

use super::base_url;
use crate::error::{AuthServerError, AuthServerResult};
use crate::models::{Claims, RefreshToken, TokenParams, TokenResponse, ACCESS_TOKEN_TTL_SECS};
use crate::pkce;
use crate::server::AuthServer;
use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, HeaderValue, Uri},
    response::{IntoResponse, Response},
    Json,
};

pub async fn token(
    State(server): State<AuthServer>,
    headers: HeaderMap,
    uri: Uri,
    form: Result<Form<TokenParams>, axum::extract::rejection::FormRejection>,
) -> AuthServerResult<Response> {
    let Form(params) = form.map_err(|e| AuthServerError::InvalidRequest(e.to_string()))?;
    let base = base_url(&headers, &uri);

    let grant_type = params
        .grant_type
        .clone()
        .ok_or_else(|| AuthServerError::InvalidRequest("grant_type is required".to_string()))?;

    let response = match grant_type.as_str() {
        "authorization_code" => authorization_code_grant(&server, &base, params).await?,
        "refresh_token" => refresh_token_grant(&server, &base, params).await?,
        other => return Err(AuthServerError::UnsupportedGrantType(other.to_string())),
    };

    let mut http_response = Json(response).into_response();
    http_response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(http_response)
}

async fn authorization_code_grant(
    server: &AuthServer,
    base: &str,
    params: TokenParams,
) -> AuthServerResult<TokenResponse> {
    let code = params
        .code
        .ok_or_else(|| AuthServerError::InvalidRequest("code is required".to_string()))?;
    let client_id = params
        .client_id
        .ok_or_else(|| AuthServerError::InvalidRequest("client_id is required".to_string()))?;
    let redirect_uri = params
        .redirect_uri
        .ok_or_else(|| AuthServerError::InvalidRequest("redirect_uri is required".to_string()))?;
    let code_verifier = params
        .code_verifier
        .ok_or_else(|| AuthServerError::InvalidRequest("code_verifier is required".to_string()))?;

    // `pkce::verify` treats an empty verifier as a mismatch regardless, but
    // rejecting it here keeps the intent explicit per §4.8.
    if code_verifier.is_empty() {
        return Err(AuthServerError::InvalidGrant("code_verifier must not be empty".to_string()));
    }

    let auth_code = server
        .codes()
        .consume(&code)
        .await
        .ok_or_else(|| AuthServerError::InvalidGrant("unknown, expired, or already-used code".to_string()))?;

    if auth_code.client_id != client_id {
        return Err(AuthServerError::InvalidGrant("client_id does not match the authorization code".to_string()));
    }
    if auth_code.redirect_uri != redirect_uri {
        return Err(AuthServerError::InvalidGrant("redirect_uri does not match the authorization code".to_string()));
    }
    if !pkce::verify(&code_verifier, &auth_code.code_challenge) {
        return Err(AuthServerError::InvalidGrant("PKCE verification failed".to_string()));
    }

    let claims = Claims::new(auth_code.user_id.clone(), auth_code.scope.clone(), client_id.clone(), base.to_string());
    let access_token = server.signing_key().mint_access_token(&claims)?;

    let refresh = RefreshToken::new(auth_code.user_id, client_id.clone(), auth_code.scope.clone());
    server.tokens().put(refresh.clone()).await;

    tracing::info!(client_id = %client_id, grant_type = "authorization_code", "issued access token");

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: ACCESS_TOKEN_TTL_SECS,
        refresh_token: refresh.token,
        scope: auth_code.scope,
    })
}

async fn refresh_token_grant(
    server: &AuthServer,
    base: &str,
    params: TokenParams,
) -> AuthServerResult<TokenResponse> {
    let old_token = params
        .refresh_token
        .ok_or_else(|| AuthServerError::InvalidRequest("refresh_token is required".to_string()))?;
    let client_id = params
        .client_id
        .ok_or_else(|| AuthServerError::InvalidRequest("client_id is required".to_string()))?;

    // Non-mutating pre-check: rejects an unknown/expired token or a client_id
    // mismatch before anything is rotated, so a request presenting the wrong
    // client_id cannot invalidate another client's still-valid token.
    let stored = server
        .tokens()
        .get(&old_token)
        .await
        .ok_or_else(|| AuthServerError::InvalidGrant("unknown or expired refresh token".to_string()))?;

    if stored.client_id != client_id {
        return Err(AuthServerError::InvalidGrant("client_id does not match the refresh token".to_string()));
    }

    let new_token = RefreshToken::new(stored.user_id.clone(), stored.client_id.clone(), stored.scope.clone());

    // The actual state change happens exactly once here: `consume_and_rotate`
    // re-validates presence/expiry and performs delete-old/insert-new under a
    // single write-lock acquisition, so of two concurrent refreshes racing on
    // the same `old_token`, only one observes `Some` and mints a token (§4.1,
    // §5, §8).
    let consumed = server
        .tokens()
        .consume_and_rotate(&old_token, new_token.clone())
        .await
        .ok_or_else(|| AuthServerError::InvalidGrant("unknown or expired refresh token".to_string()))?;

    let claims = Claims::new(consumed.user_id, consumed.scope.clone(), client_id.clone(), base.to_string());
    let access_token = server.signing_key().mint_access_token(&claims)?;

    tracing::info!(client_id = %client_id, grant_type = "refresh_token", "issued access token");

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: ACCESS_TOKEN_TTL_SECS,
        refresh_token: new_token.token,
        scope: consumed.scope,
    })
}
