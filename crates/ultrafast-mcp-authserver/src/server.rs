//! The authorization server façade: owns the four entity stores and the JWT
//! signing key, builds the axum [`Router`], and runs the periodic cleanup
//! sweep (§2, §5, §9).

use crate::config::ServerConfig;
use crate::crypto::SigningKey;
use crate::error::{AuthServerError, AuthServerResult};
use crate::handlers::{authorize, discovery, register, token};
use crate::models::AuthCode;
use crate::store::{ClientStore, CodeStore, SessionStore, TokenStore};
use crate::backend::BackendClient;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Cheaply `Clone`-able handle to the authorization server's shared state.
/// Every store is itself `Arc`-backed, so cloning this struct is an `Arc`
/// bump per field — the shape axum's `State` extractor expects.
#[derive(Clone)]
pub struct AuthServer {
    clients: ClientStore,
    sessions: SessionStore,
    codes: CodeStore,
    tokens: TokenStore,
    signing_key: SigningKey,
    issuer: String,
}

impl AuthServer {
    pub fn new(config: ServerConfig) -> AuthServerResult<Self> {
        let config = config.validate()?;
        let backend = config.backend_url.as_deref().map(BackendClient::new);
        Ok(Self {
            clients: ClientStore::new(backend.clone()),
            sessions: SessionStore::new(backend.clone()),
            codes: CodeStore::new(backend.clone()),
            tokens: TokenStore::new(backend),
            signing_key: SigningKey::new(config.jwt_secret)?,
            issuer: config.issuer,
        })
    }

    pub fn clients(&self) -> &ClientStore {
        &self.clients
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn codes(&self) -> &CodeStore {
        &self.codes
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// The configured fallback issuer. Request handlers should prefer the
    /// per-request, `Host`-derived base URL (§4.3); this is used only where
    /// no request is in scope.
    pub fn configured_issuer(&self) -> &str {
        &self.issuer
    }

    /// Turns a pending session into an authorization code and returns the
    /// redirect URL the browser should be sent to next (§4.6).
    ///
    /// The session is consumed atomically: two concurrent calls with the same
    /// `session_id` cannot both succeed (§5, §9).
    pub async fn complete_authorization(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> AuthServerResult<String> {
        let session = self
            .sessions
            .consume(session_id)
            .await
            .ok_or_else(|| AuthServerError::InvalidGrant("unknown or expired session".to_string()))?;

        let code = crate::crypto::generate_hex_id(16);
        let auth_code = AuthCode {
            code: code.clone(),
            client_id: session.client_id,
            user_id: user_id.to_string(),
            redirect_uri: session.redirect_uri.clone(),
            code_challenge: session.code_challenge,
            scope: session.scope,
            expires_at: crate::models::unix_now() + crate::models::AUTH_CODE_TTL_SECS,
            used: false,
        };
        self.codes.put(auth_code).await;

        let mut url = url::Url::parse(&session.redirect_uri)?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("code", &code);
            q.append_pair("state", &session.state);
        }
        tracing::info!(session_id, "authorization completed, code issued");
        Ok(url.to_string())
    }

    /// Sweeps expired sessions, codes, and refresh tokens. Clients never
    /// expire, so the client store has nothing to sweep (§4.1).
    pub async fn cleanup(&self) {
        let sessions = self.sessions.cleanup().await;
        let codes = self.codes.cleanup().await;
        let tokens = self.tokens.cleanup().await;
        if sessions + codes + tokens > 0 {
            tracing::debug!(sessions, codes, tokens, "periodic cleanup swept expired entries");
        }
    }

    /// Spawns the periodic cleanup task at the configured interval (§5, §9).
    /// The returned handle may be dropped by the host; the task runs for the
    /// lifetime of the process otherwise.
    pub fn spawn_cleanup_task(&self, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                server.cleanup().await;
            }
        })
    }

    /// Builds the axum router serving every endpoint in §6.
    pub fn router(self) -> Router {
        Router::new()
            .route(
                "/.well-known/oauth-authorization-server",
                get(discovery::authorization_server_metadata),
            )
            .route("/.well-known/oauth-protected-resource", get(discovery::protected_resource_metadata))
            .route("/register", post(register::register))
            .route("/authorize", get(authorize::authorize_get).post(authorize::authorize_post))
            .route("/token", post(token::token))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            issuer: "http://localhost:8080".to_string(),
            backend_url: None,
            jwt_secret: "test-secret".to_string(),
            cleanup_interval_secs: 60,
        }
    }

    #[tokio::test]
    async fn complete_authorization_is_single_use() {
        let server = AuthServer::new(config()).unwrap();
        let session = crate::models::AuthSession {
            session_id: "s1".to_string(),
            client_id: "c1".to_string(),
            redirect_uri: "http://localhost:7777/cb".to_string(),
            state: "st1".to_string(),
            code_challenge: "challenge".to_string(),
            code_challenge_method: "S256".to_string(),
            scope: "openid".to_string(),
            created_at: crate::models::unix_now(),
            user_id: None,
        };
        server.sessions().put(session).await;

        let redirect = server.complete_authorization("s1", "u1").await.unwrap();
        assert!(redirect.starts_with("http://localhost:7777/cb?"));
        assert!(redirect.contains("code="));
        assert!(redirect.contains("state=st1"));

        assert!(server.complete_authorization("s1", "u1").await.is_err());
    }

    #[tokio::test]
    async fn empty_secret_is_rejected_at_construction() {
        let mut bad = config();
        bad.jwt_secret = String::new();
        assert!(AuthServer::new(bad).is_err());
    }
}
