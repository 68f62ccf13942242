//! In-memory store for pending `AuthSession`s (§3, §4.5, §4.6).

use crate::backend::BackendClient;
use crate::models::AuthSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, AuthSession>>>,
    backend: Option<BackendClient>,
}

impl SessionStore {
    pub fn new(backend: Option<BackendClient>) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), backend }
    }

    pub async fn put(&self, session: AuthSession) {
        let id = session.session_id.clone();
        self.sessions.write().await.insert(id, session.clone());
        if let Some(backend) = &self.backend {
            if !backend.save_session(&session).await {
                tracing::warn!(session_id = %session.session_id, "backend write-through for session failed");
            }
        }
    }

    /// Expiry is checked after the read: an expired session is reported absent
    /// and removed from the local map so it does not linger until `cleanup`.
    pub async fn get(&self, session_id: &str) -> Option<AuthSession> {
        let local = self.sessions.read().await.get(session_id).cloned();
        let session = match local {
            Some(session) => session,
            None => {
                let backend = self.backend.as_ref()?;
                let session = backend.get_session(session_id).await?;
                self.sessions.write().await.insert(session_id.to_string(), session.clone());
                session
            }
        };
        if session.is_expired() {
            self.sessions.write().await.remove(session_id);
            return None;
        }
        Some(session)
    }

    /// Finds the most recently created, not-yet-expired pending session for a
    /// client id. Used by the sparse-query `GET /authorize` preflight-completion
    /// path (§4.5): the CLI's `POST /authorize` already created the session, so a
    /// subsequent `GET` carrying only `client_id` must find it rather than
    /// minting a second, divergent session.
    pub async fn get_by_client_id(&self, client_id: &str) -> Option<AuthSession> {
        let local = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|s| s.client_id == client_id && !s.is_expired())
                .max_by_key(|s| s.created_at)
                .cloned()
        };
        if local.is_some() {
            return local;
        }
        let backend = self.backend.as_ref()?;
        let session = backend.get_session_by_client_id(client_id).await?;
        if session.is_expired() {
            return None;
        }
        self.sessions.write().await.insert(session.session_id.clone(), session.clone());
        Some(session)
    }

    pub async fn delete(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
        if let Some(backend) = &self.backend {
            backend.delete_session(session_id).await;
        }
    }

    /// Atomically fetches and removes a session under one write-lock critical
    /// section, so two concurrent `CompleteAuthorization` calls for the same
    /// `session_id` cannot both observe it present (§4.6, §5, §9).
    pub async fn consume(&self, session_id: &str) -> Option<AuthSession> {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(session_id) {
            Some(session) if !session.is_expired() => {
                drop(sessions);
                if let Some(backend) = &self.backend {
                    backend.delete_session(session_id).await;
                }
                Some(session)
            }
            Some(_expired) => {
                drop(sessions);
                if let Some(backend) = &self.backend {
                    backend.delete_session(session_id).await;
                }
                None
            }
            None => {
                drop(sessions);
                let backend = self.backend.as_ref()?;
                let session = backend.get_session(session_id).await?;
                backend.delete_session(session_id).await;
                if session.is_expired() {
                    return None;
                }
                Some(session)
            }
        }
    }

    /// Sweeps expired sessions from the local map. Must be invoked periodically
    /// by the host (§5, §9) — nothing else bounds memory growth.
    pub async fn cleanup(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "session cleanup swept expired entries");
        }
        removed
    }
}
