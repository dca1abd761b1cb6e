//! Token Cache
//!
//! Holds one bearer token per (client identity, scope set) and refreshes it
//! on expiry. Reads of a valid token take a shared lock only. Refreshes for
//! the same key are serialized behind a per-key async guard, so callers that
//! arrive during a refresh wait for its result instead of starting another.

use chrono::Duration;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::types::{Token, TokenKey};

/// In-memory token cache with single-flight refresh.
pub struct TokenCache {
    entries: RwLock<HashMap<TokenKey, Token>>,
    refresh_guards: Mutex<HashMap<TokenKey, Arc<AsyncMutex<()>>>>,
    refresh_buffer: Duration,
}

impl TokenCache {
    /// Create new cache; tokens are valid while `now < expiry`.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            refresh_guards: Mutex::new(HashMap::new()),
            refresh_buffer: Duration::zero(),
        }
    }

    /// Treat tokens as expired `buffer` before their expiry.
    pub fn with_refresh_buffer(mut self, buffer: std::time::Duration) -> Self {
        self.refresh_buffer = Duration::from_std(buffer).unwrap_or_else(|_| Duration::zero());
        self
    }

    /// Return the cached token for `key`, or obtain a new one with `refresh`.
    ///
    /// `refresh` receives the entry being replaced, if any, so it can use a
    /// stored refresh token. On success the new token replaces the entry. On
    /// failure the entry is evicted and the error is returned unchanged; a
    /// stale token is never handed out.
    pub async fn get<F, Fut, E>(&self, key: &TokenKey, refresh: F) -> Result<Token, E>
    where
        F: FnOnce(Option<Token>) -> Fut,
        Fut: Future<Output = Result<Token, E>>,
        E: Display,
    {
        if let Some(token) = self.valid(key) {
            trace!(key = %key, "Token cache hit");
            return Ok(token);
        }

        let guard = self.guard_for(key);
        let _in_flight = guard.lock().await;

        // Another caller may have refreshed while this one waited.
        if let Some(token) = self.valid(key) {
            trace!(key = %key, "Token refreshed by concurrent caller");
            return Ok(token);
        }

        let previous = self.entries.read().get(key).cloned();
        debug!(key = %key, had_token = previous.is_some(), "Refreshing token");

        match refresh(previous).await {
            Ok(token) => {
                self.entries.write().insert(key.clone(), token.clone());
                debug!(key = %key, expiry = ?token.expiry, "Token refreshed");
                Ok(token)
            }
            Err(e) => {
                self.entries.write().remove(key);
                warn!(key = %key, error = %e, "Token refresh failed, entry evicted");
                Err(e)
            }
        }
    }

    /// Store a token obtained elsewhere, replacing any entry for `key`.
    pub fn insert(&self, key: TokenKey, token: Token) {
        debug!(key = %key, "Token stored");
        self.entries.write().insert(key, token);
    }

    /// Stored token for `key`, valid or not, without refreshing.
    pub fn peek(&self, key: &TokenKey) -> Option<Token> {
        self.entries.read().get(key).cloned()
    }

    /// Whether a valid token is cached for `key`.
    pub fn has_valid(&self, key: &TokenKey) -> bool {
        self.valid(key).is_some()
    }

    /// Remove the token for `key`. Returns whether one was stored.
    pub fn invalidate(&self, key: &TokenKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Remove every token.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn valid(&self, key: &TokenKey) -> Option<Token> {
        self.entries
            .read()
            .get(key)
            .filter(|token| token.is_valid(self.refresh_buffer))
            .cloned()
    }

    fn guard_for(&self, key: &TokenKey) -> Arc<AsyncMutex<()>> {
        self.refresh_guards
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.len())
            .field("refresh_buffer", &self.refresh_buffer)
            .finish()
    }
}
