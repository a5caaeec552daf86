/// Refresh Token Store
///
/// Maps opaque refresh tokens to the principal they were issued to and their
/// absolute expiry. The store is the single source of truth for refresh token
/// validity:
/// - `get` is a pure lookup and never evicts; expiry is the caller's check
/// - `revoke` is idempotent and reports whether it removed a mapping, which is
///   what makes rotation single-use under concurrent redemption
/// - Tokens are hashed with SHA-256 before they are used as keys

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{AppError, StoreError};

/// What a refresh token resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub identity: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// A record is dead from its expiry instant onwards
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Keyed store of live refresh tokens
///
/// Every operation must be linearizable per token. A durable implementation
/// has to provide `revoke` as a conditional delete that reports whether this
/// call removed the entry.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Insert or overwrite the mapping for `token`
    async fn store(
        &self,
        token: &str,
        identity: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Look up `token` without side effects
    async fn get(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Remove `token`. Returns `true` only if this call removed a mapping.
    async fn revoke(&self, token: &str) -> Result<bool, AppError>;

    /// Remove every token issued to `identity` (case-insensitive). Returns the count removed.
    async fn revoke_all(&self, identity: &str) -> Result<usize, AppError>;

    /// Physically drop entries with `expires_at <= now`. Returns the count removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}

/// Hash a refresh token using SHA-256
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Process-local store guarded by a single mutex
///
/// The lock is never held across an `.await`, so every call completes in
/// bounded time.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    entries: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, RefreshTokenRecord>>, AppError> {
        self.entries.lock().map_err(|_| {
            tracing::error!("Refresh token table lock poisoned");
            AppError::Store(StoreError::Unavailable(
                "refresh token table lock poisoned".to_string(),
            ))
        })
    }

    /// Number of entries currently held, expired ones included
    pub fn len(&self) -> Result<usize, AppError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.lock()?.is_empty())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn store(
        &self,
        token: &str,
        identity: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let record = RefreshTokenRecord {
            identity: identity.to_string(),
            expires_at,
        };
        // Overwrite on collision; 64 base62 characters make it negligible
        if self.lock()?.insert(hash_token(token), record).is_some() {
            tracing::warn!(identity = %identity, "Refresh token collision, previous entry overwritten");
        }
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(self.lock()?.get(&hash_token(token)).cloned())
    }

    async fn revoke(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.remove(&hash_token(token)).is_some())
    }

    async fn revoke_all(&self, identity: &str) -> Result<usize, AppError> {
        let identity = identity.to_lowercase();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, record| record.identity.to_lowercase() != identity);
        Ok(before - entries.len())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, record| !record.is_expired_at(now));
        Ok(before - entries.len())
    }
}
