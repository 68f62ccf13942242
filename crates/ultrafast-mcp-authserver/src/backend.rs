//! Optional write-through/read-through adapter to a remote persistence REST API.
//!
//! The local stores are authoritative; this adapter exists only to give a fleet
//! of server instances a shared cache. Every call is non-fatal on failure: callers
//! log at WARN and keep treating the local map as the answer (§4.2/§9).

use crate::models::{AuthCode, AuthSession, OAuthClient, RefreshToken};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

const BACKEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .expect("reqwest client builder with a fixed timeout cannot fail");
        Self { http, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> bool {
        match self.http.post(self.url(path)).json(body).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::warn!(path, status = %resp.status(), "backend write rejected");
                false
            }
            Err(err) => {
                tracing::warn!(path, error = %err, "backend write failed");
                false
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        match self.http.get(self.url(path)).send().await {
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => None,
            Ok(resp) if resp.status().is_success() => resp.json::<T>().await.ok(),
            Ok(resp) => {
                tracing::warn!(path, status = %resp.status(), "backend read failed");
                None
            }
            Err(err) => {
                tracing::warn!(path, error = %err, "backend read failed");
                None
            }
        }
    }

    async fn delete(&self, path: &str) {
        if let Err(err) = self.http.delete(self.url(path)).send().await {
            tracing::warn!(path, error = %err, "backend delete failed");
        }
    }

    async fn patch<T: Serialize>(&self, path: &str, body: &T) {
        if let Err(err) = self.http.patch(self.url(path)).json(body).send().await {
            tracing::warn!(path, error = %err, "backend patch failed");
        }
    }

    pub async fn save_client(&self, client: &OAuthClient) -> bool {
        self.post("/api/internal/oauth/clients", client).await
    }

    pub async fn get_client(&self, id: &str) -> Option<OAuthClient> {
        self.get(&format!("/api/internal/oauth/clients/{id}")).await
    }

    pub async fn save_session(&self, session: &AuthSession) -> bool {
        self.post("/api/internal/oauth/sessions", session).await
    }

    pub async fn get_session(&self, id: &str) -> Option<AuthSession> {
        self.get(&format!("/api/internal/oauth/sessions/{id}")).await
    }

    pub async fn get_session_by_client_id(&self, client_id: &str) -> Option<AuthSession> {
        self.get(&format!("/api/internal/oauth/sessions?client_id={client_id}")).await
    }

    pub async fn update_session_user_id(&self, id: &str, user_id: &str) {
        #[derive(Serialize)]
        struct Body<'a> {
            user_id: &'a str,
        }
        self.patch(&format!("/api/internal/oauth/sessions/{id}"), &Body { user_id }).await;
    }

    pub async fn delete_session(&self, id: &str) {
        self.delete(&format!("/api/internal/oauth/sessions/{id}")).await;
    }

    pub async fn save_code(&self, code: &AuthCode) -> bool {
        self.post("/api/internal/oauth/codes", code).await
    }

    pub async fn get_code(&self, code: &str) -> Option<AuthCode> {
        self.get(&format!("/api/internal/oauth/codes/{code}")).await
    }

    pub async fn mark_code_used(&self, code: &str) {
        self.patch(&format!("/api/internal/oauth/codes/{code}/used"), &serde_json::json!({})).await;
    }

    pub async fn save_token(&self, token: &RefreshToken) -> bool {
        self.post("/api/internal/oauth/tokens", token).await
    }

    pub async fn lookup_token(&self, token: &str) -> Option<RefreshToken> {
        #[derive(Serialize)]
        struct Body<'a> {
            token: &'a str,
        }
        match self
            .http
            .post(self.url("/api/internal/oauth/tokens/lookup"))
            .json(&Body { token })
            .send()
            .await
        {
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => None,
            Ok(resp) if resp.status().is_success() => resp.json::<RefreshToken>().await.ok(),
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "backend token lookup failed");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "backend token lookup failed");
                None
            }
        }
    }

    pub async fn revoke_token(&self, token: &str) {
        #[derive(Serialize)]
        struct Body<'a> {
            token: &'a str,
        }
        let _ = self.post("/api/internal/oauth/tokens/revoke", &Body { token }).await;
    }
}
