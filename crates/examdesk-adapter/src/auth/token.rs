/*
[INPUT]:  Bearer tokens and expiration timestamps
[OUTPUT]: Token retrieval, expiration status and change notifications
[POS]:    Auth layer - token lifecycle management
[UPDATE]: When adding token refresh or changing storage strategy
*/

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Stored token data with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    pub token: String,
    /// `None` means the issuer did not report a lifetime
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenData {
    /// Expiry instant `seconds` from now, `None` when it is past what
    /// `DateTime<Utc>` can represent.
    pub fn expiry_after(seconds: u64) -> Option<DateTime<Utc>> {
        let seconds = i64::try_from(seconds).ok()?;
        Utc::now().checked_add_signed(TimeDelta::try_seconds(seconds)?)
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }
}

/// Shared bearer token holder.
///
/// Clones share the same slot. Every change is broadcast on a `watch`
/// channel so consumers that were waiting for a credential can pick it up.
#[derive(Debug, Clone)]
pub struct TokenStore {
    tx: Arc<watch::Sender<Option<TokenData>>>,
}

impl TokenStore {
    /// Create a new empty token store
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Create a store that already holds `token`
    pub fn with_token(token: impl Into<String>, expires_seconds: Option<u64>) -> Self {
        let store = Self::new();
        store.set_token(token, expires_seconds);
        store
    }

    /// Store a new token, optionally with a lifetime in seconds
    pub fn set_token(&self, token: impl Into<String>, expires_seconds: Option<u64>) {
        let expires_at = expires_seconds.and_then(|seconds| {
            let expires_at = TokenData::expiry_after(seconds);
            if expires_at.is_none() {
                tracing::warn!(seconds, "token lifetime out of range; treating as non-expiring");
            }
            expires_at
        });
        self.tx.send_replace(Some(TokenData {
            token: token.into(),
            expires_at,
        }));
    }

    /// Get the current token if available, expired or not
    pub fn get_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|data| data.token.clone())
    }

    /// Get the current token only while it is still valid
    pub fn valid_token(&self) -> Option<String> {
        self.tx
            .borrow()
            .as_ref()
            .filter(|data| !data.is_expired())
            .map(|data| data.token.clone())
    }

    /// Check if token is expired (a missing token counts as expired)
    pub fn is_expired(&self) -> bool {
        match self.tx.borrow().as_ref() {
            Some(data) => data.is_expired(),
            None => true,
        }
    }

    /// Get token data if available
    pub fn token_data(&self) -> Option<TokenData> {
        self.tx.borrow().clone()
    }

    /// Clear the stored token
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Subscribe to token changes
    pub fn subscribe(&self) -> watch::Receiver<Option<TokenData>> {
        self.tx.subscribe()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
