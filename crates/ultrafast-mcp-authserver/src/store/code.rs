//! In-memory store for single-use `AuthCode`s (§3, §4.7, §5).
//!
//! `consume` is the load-bearing primitive: fetch, expiry check, used check,
//! and marking used all happen under one write-lock acquisition, closing the
//! TOCTOU window a naive `get` followed by a separate `mark_used` would leave
//! open to concurrent `/token` exchanges of the same code (§8, §9).

use crate::backend::BackendClient;
use crate::models::AuthCode;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct CodeStore {
    codes: Arc<RwLock<HashMap<String, AuthCode>>>,
    backend: Option<BackendClient>,
}

impl CodeStore {
    pub fn new(backend: Option<BackendClient>) -> Self {
        Self { codes: Arc::new(RwLock::new(HashMap::new())), backend }
    }

    pub async fn put(&self, code: AuthCode) {
        let key = code.code.clone();
        self.codes.write().await.insert(key, code.clone());
        if let Some(backend) = &self.backend {
            if !backend.save_code(&code).await {
                tracing::warn!(code = %code.code, "backend write-through for auth code failed");
            }
        }
    }

    /// Atomically consumes a code: present, unexpired, and unused become
    /// present-and-now-used; anything else (absent, expired, already used)
    /// reports `None`. Exactly one concurrent caller for a given code observes
    /// `Some`.
    pub async fn consume(&self, code: &str) -> Option<AuthCode> {
        let mut codes = self.codes.write().await;
        if let Some(entry) = codes.get_mut(code) {
            if entry.is_expired() || entry.used {
                return None;
            }
            entry.used = true;
            let consumed = entry.clone();
            drop(codes);
            if let Some(backend) = &self.backend {
                backend.mark_code_used(code).await;
            }
            return Some(consumed);
        }
        drop(codes);
        let backend = self.backend.as_ref()?;
        let fetched = backend.get_code(code).await?;
        if fetched.is_expired() || fetched.used {
            return None;
        }
        let mut codes = self.codes.write().await;
        // re-check under the lock in case a concurrent caller raced us to the insert
        if let Some(existing) = codes.get(code) {
            if existing.used {
                return None;
            }
        }
        let mut consumed = fetched;
        consumed.used = true;
        codes.insert(code.to_string(), consumed.clone());
        drop(codes);
        backend.mark_code_used(code).await;
        Some(consumed)
    }

    pub async fn cleanup(&self) -> usize {
        let mut codes = self.codes.write().await;
        let before = codes.len();
        codes.retain(|_, c| !c.is_expired());
        let removed = before - codes.len();
        if removed > 0 {
            tracing::debug!(removed, "code cleanup swept expired entries");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::unix_now;

    fn code(value: &str) -> AuthCode {
        AuthCode {
            code: value.to_string(),
            client_id: "c1".to_string(),
            user_id: "u1".to_string(),
            redirect_uri: "http://localhost:7777/cb".to_string(),
            code_challenge: "challenge".to_string(),
            scope: "openid".to_string(),
            expires_at: unix_now() + 300,
            used: false,
        }
    }

    #[tokio::test]
    async fn single_use_exactly_once() {
        let store = CodeStore::new(None);
        store.put(code("abc")).await;
        assert!(store.consume("abc").await.is_some());
        assert!(store.consume("abc").await.is_none());
    }

    #[tokio::test]
    async fn expired_code_cannot_be_consumed() {
        let store = CodeStore::new(None);
        let mut c = code("abc");
        c.expires_at = 0;
        store.put(c).await;
        assert!(store.consume("abc").await.is_none());
    }

    #[tokio::test]
    async fn concurrent_consume_yields_exactly_one_winner() {
        let store = CodeStore::new(None);
        store.put(code("race")).await;
        let store_a = store.clone();
        let store_b = store.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { store_a.consume("race").await }),
            tokio::spawn(async move { store_b.consume("race").await }),
        );
        let winners = [a.unwrap(), b.unwrap()].into_iter().filter(Option::is_some).count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn cleanup_sweeps_expired() {
        let store = CodeStore::new(None);
        let mut expired = code("e1");
        expired.expires_at = 0;
        store.put(expired).await;
        store.put(code("fresh")).await;
        assert_eq!(store.cleanup().await, 1);
    }
}
