//! In-memory store for registered `OAuthClient`s.
//!
//! Clients never expire and are never deleted (§3), so this store is the
//! simplest of the four: no TTL, no `Cleanup`, no atomic consume/rotate.

use crate::backend::BackendClient;
use crate::models::OAuthClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct ClientStore {
    clients: Arc<RwLock<HashMap<String, OAuthClient>>>,
    backend: Option<BackendClient>,
}

impl ClientStore {
    pub fn new(backend: Option<BackendClient>) -> Self {
        Self { clients: Arc::new(RwLock::new(HashMap::new())), backend }
    }

    /// Writes locally, then write-through to the backend if configured.
    /// Backend failure is logged and otherwise ignored: the local map is authoritative.
    pub async fn put(&self, client: OAuthClient) {
        let client_id = client.client_id.clone();
        self.clients.write().await.insert(client_id, client.clone());
        if let Some(backend) = &self.backend {
            if !backend.save_client(&client).await {
                tracing::warn!(client_id = %client.client_id, "backend write-through for client failed");
            }
        }
    }

    /// Reads locally; on miss, reads through the backend and caches the result.
    pub async fn get(&self, client_id: &str) -> Option<OAuthClient> {
        if let Some(client) = self.clients.read().await.get(client_id).cloned() {
            return Some(client);
        }
        let backend = self.backend.as_ref()?;
        let client = backend.get_client(client_id).await?;
        self.clients.write().await.insert(client_id.to_string(), client.clone());
        Some(client)
    }
}
