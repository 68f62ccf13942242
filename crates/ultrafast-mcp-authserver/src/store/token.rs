//! In-memory store for rotatable `RefreshToken`s (§3, §4.7, §5).
//!
//! `consume_and_rotate` is the load-bearing primitive: checking that `old` is
//! still present and unexpired, then deleting it and inserting `new`, all
//! happen under one write-lock acquisition. A caller that instead issued
//! `get`, then `rotate` as two separate lock acquisitions would leave a
//! window where two concurrent refreshes of the same token both pass the
//! `get` check before either rotates, so both mint an access token and both
//! "successfully" rotate — exactly the replay this primitive closes (§8, §9).

use crate::backend::BackendClient;
use crate::models::RefreshToken;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct TokenStore {
    tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
    backend: Option<BackendClient>,
}

impl TokenStore {
    pub fn new(backend: Option<BackendClient>) -> Self {
        Self { tokens: Arc::new(RwLock::new(HashMap::new())), backend }
    }

    pub async fn put(&self, token: RefreshToken) {
        let key = token.token.clone();
        self.tokens.write().await.insert(key, token.clone());
        if let Some(backend) = &self.backend {
            if !backend.save_token(&token).await {
                tracing::warn!("backend write-through for refresh token failed");
            }
        }
    }

    pub async fn get(&self, token: &str) -> Option<RefreshToken> {
        let local = self.tokens.read().await.get(token).cloned();
        let entry = match local {
            Some(entry) => entry,
            None => {
                let backend = self.backend.as_ref()?;
                let entry = backend.lookup_token(token).await?;
                self.tokens.write().await.insert(token.to_string(), entry.clone());
                entry
            }
        };
        if entry.is_expired() {
            self.tokens.write().await.remove(token);
            return None;
        }
        Some(entry)
    }

    /// Atomically validates `old` (present, unexpired) and replaces it with
    /// `new` under a single write-lock acquisition: presence/expiry check and
    /// delete-old/insert-new all happen before the lock is released. Returns
    /// the consumed `old` token on success; `None` if `old` was absent or
    /// expired (mirrors `CodeStore::consume` in `store/code.rs`). This is the
    /// only sanctioned way to rotate — a separate `get` followed by a separate
    /// `rotate` is racy and must not be used on the hot refresh path (§4.1).
    pub async fn consume_and_rotate(&self, old: &str, new: RefreshToken) -> Option<RefreshToken> {
        let mut tokens = self.tokens.write().await;
        if let Some(entry) = tokens.get(old) {
            if entry.is_expired() {
                return None;
            }
            let consumed = entry.clone();
            tokens.remove(old);
            let new_key = new.token.clone();
            tokens.insert(new_key, new.clone());
            drop(tokens);
            if let Some(backend) = &self.backend {
                backend.revoke_token(old).await;
                if !backend.save_token(&new).await {
                    tracing::warn!("backend write-through for rotated refresh token failed");
                }
            }
            return Some(consumed);
        }
        drop(tokens);
        let backend = self.backend.as_ref()?;
        let fetched = backend.lookup_token(old).await?;
        if fetched.is_expired() {
            return None;
        }
        let mut tokens = self.tokens.write().await;
        // re-check under the lock in case a concurrent caller raced us to the insert
        if let Some(existing) = tokens.get(old) {
            if existing.is_expired() {
                return None;
            }
            tokens.remove(old);
        }
        let new_key = new.token.clone();
        tokens.insert(new_key, new.clone());
        drop(tokens);
        backend.revoke_token(old).await;
        if !backend.save_token(&new).await {
            tracing::warn!("backend write-through for rotated refresh token failed");
        }
        Some(fetched)
    }

    pub async fn cleanup(&self) -> usize {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired());
        let removed = before - tokens.len();
        if removed > 0 {
            tracing::debug!(removed, "refresh token cleanup swept expired entries");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: &str) -> RefreshToken {
        RefreshToken {
            token: value.to_string(),
            user_id: "u1".to_string(),
            client_id: "c1".to_string(),
            scope: "openid".to_string(),
            expires_at: crate::models::unix_now() + 3600,
        }
    }

    #[tokio::test]
    async fn rotation_invalidates_old_and_admits_new() {
        let store = TokenStore::new(None);
        store.put(token("r1")).await;
        assert!(store.consume_and_rotate("r1", token("r2")).await.is_some());
        assert!(store.get("r1").await.is_none());
        assert!(store.get("r2").await.is_some());
    }

    #[tokio::test]
    async fn rotating_an_already_rotated_token_fails() {
        let store = TokenStore::new(None);
        store.put(token("r1")).await;
        assert!(store.consume_and_rotate("r1", token("r2")).await.is_some());
        assert!(store.consume_and_rotate("r1", token("r3")).await.is_none());
        assert!(store.get("r3").await.is_none());
    }

    #[tokio::test]
    async fn expired_token_reported_absent() {
        let store = TokenStore::new(None);
        let mut t = token("r1");
        t.expires_at = 0;
        store.put(t).await;
        assert!(store.get("r1").await.is_none());
    }

    #[tokio::test]
    async fn expired_token_cannot_be_rotated() {
        let store = TokenStore::new(None);
        let mut t = token("r1");
        t.expires_at = 0;
        store.put(t).await;
        assert!(store.consume_and_rotate("r1", token("r2")).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_rotation_yields_exactly_one_winner() {
        let store = TokenStore::new(None);
        store.put(token("race")).await;
        let store_a = store.clone();
        let store_b = store.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { store_a.consume_and_rotate("race", token("race-a")).await }),
            tokio::spawn(async move { store_b.consume_and_rotate("race", token("race-b")).await }),
        );
        let winners = [a.unwrap(), b.unwrap()].into_iter().filter(Option::is_some).count();
        assert_eq!(winners, 1);
    }
}
