//! Entity types owned by the authorization server's stores, plus the wire-format
//! request/response shapes for DCR, token issuance, and JWT claims.

use serde::{Deserialize, Serialize};

fn now_unix() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

pub const SESSION_TTL_SECS: u64 = 10 * 60;
pub const AUTH_CODE_TTL_SECS: u64 = 5 * 60;
pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const ACCESS_TOKEN_TTL_SECS: u64 = 60 * 60;

/// A registered OAuth client (RFC 7591). `client_id` is immutable once assigned;
/// clients are never deleted or expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub created_at: u64,
}

impl OAuthClient {
    pub fn redirect_uri_matches(&self, candidate: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == candidate)
    }
}

/// A pending authorization awaiting the login page to call `CompleteAuthorization`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub session_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub state: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub scope: String,
    pub created_at: u64,
    pub user_id: Option<String>,
}

impl AuthSession {
    pub fn is_expired(&self) -> bool {
        now_unix() >= self.created_at + SESSION_TTL_SECS
    }
}

/// A single-use authorization code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCode {
    pub code: String,
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub code_challenge: String,
    pub scope: String,
    pub expires_at: u64,
    pub used: bool,
}

impl AuthCode {
    pub fn is_expired(&self) -> bool {
        now_unix() >= self.expires_at
    }
}

/// A long-lived, rotatable refresh credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: String,
    pub client_id: String,
    pub scope: String,
    pub expires_at: u64,
}

impl RefreshToken {
    pub fn is_expired(&self) -> bool {
        now_unix() >= self.expires_at
    }

    pub fn new(user_id: String, client_id: String, scope: String) -> Self {
        Self {
            token: crate::crypto::generate_refresh_token(),
            user_id,
            client_id,
            scope,
            expires_at: now_unix() + REFRESH_TOKEN_TTL_SECS,
        }
    }
}

/// Access token claims (not stored; minted fresh per request).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub scope: String,
    pub client_id: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn new(sub: String, scope: String, client_id: String, iss: String) -> Self {
        let iat = now_unix();
        Self { sub, scope, client_id, iss, iat, exp: iat + ACCESS_TOKEN_TTL_SECS }
    }
}

/// Client registration request body (RFC 7591).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRegistrationRequest {
    pub client_name: Option<String>,
    pub redirect_uris: Vec<String>,
    pub grant_types: Option<Vec<String>>,
    pub response_types: Option<Vec<String>>,
    pub token_endpoint_auth_method: Option<String>,
}

/// Client registration response body (RFC 7591).
#[derive(Debug, Clone, Serialize)]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub client_id_issued_at: u64,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
}

impl From<OAuthClient> for ClientRegistrationResponse {
    fn from(c: OAuthClient) -> Self {
        Self {
            client_id: c.client_id,
            client_secret: c.client_secret,
            client_id_issued_at: c.created_at,
            client_name: c.client_name,
            redirect_uris: c.redirect_uris,
            grant_types: c.grant_types,
            response_types: c.response_types,
            token_endpoint_auth_method: c.token_endpoint_auth_method,
        }
    }
}

/// `/token` success response body.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub refresh_token: String,
    pub scope: String,
}

/// `/authorize` form/query parameters, shared by GET and POST.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeParams {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub response_type: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub state: Option<String>,
    pub scope: Option<String>,
}

/// `/token` form body, shared by both grant types.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenParams {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
}

pub(crate) use now_unix as unix_now;
