//! `POST /register` — Dynamic Client Registration (RFC 7591), §4.4.

use crate::crypto::generate_hex_id;
use crate::error::{AuthServerError, AuthServerResult};
use crate::models::{ClientRegistrationRequest, ClientRegistrationResponse, OAuthClient};
use crate::server::AuthServer;
use axum::{extract::State, http::StatusCode, Json};

pub async fn register(
    State(server): State<AuthServer>,
    body: Result<Json<ClientRegistrationRequest>, axum::extract::rejection::JsonRejection>,
) -> AuthServerResult<(StatusCode, Json<ClientRegistrationResponse>)> {
    let Json(request) = body.map_err(|e| AuthServerError::InvalidRequest(e.to_string()))?;

    if request.redirect_uris.is_empty() {
        return Err(AuthServerError::InvalidRequest("redirect_uris must be non-empty".to_string()));
    }

    let client = OAuthClient {
        client_id: uuid::Uuid::new_v4().to_string(),
        client_secret: Some(generate_hex_id(32)),
        client_name: request.client_name.unwrap_or_else(|| "unnamed client".to_string()),
        redirect_uris: request.redirect_uris,
        grant_types: request
            .grant_types
            .unwrap_or_else(|| vec!["authorization_code".to_string(), "refresh_token".to_string()]),
        response_types: request.response_types.unwrap_or_else(|| vec!["code".to_string()]),
        token_endpoint_auth_method: request.token_endpoint_auth_method.unwrap_or_else(|| "none".to_string()),
        created_at: crate::models::unix_now(),
    };

    server.clients().put(client.clone()).await;
    tracing::info!(client_id = %client.client_id, "registered new OAuth client");

    Ok((StatusCode::CREATED, Json(client.into())))
}
