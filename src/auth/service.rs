/// Auth Orchestrator
///
/// Coordinates login, refresh token rotation and revocation on top of the
/// credential store, the token signer and the refresh token store.
///
/// A session chain moves `Unauthenticated -> Active -> Revoked/Expired`. The
/// orchestrator keeps no token state of its own; the refresh token store
/// decides whether a token is still live.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::credentials::{CredentialStore, Principal};
use crate::auth::jwt::TokenSigner;
use crate::auth::refresh_token::RefreshTokenStore;
use crate::error::{AppError, AuthError, ConfigError, ErrorContext};

/// Tokens handed back by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry (UTC)
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<CredentialStore>,
    signer: TokenSigner,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    refresh_token_lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        credentials: Arc<CredentialStore>,
        signer: TokenSigner,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        refresh_token_lifetime: Duration,
    ) -> Self {
        Self {
            credentials,
            signer,
            refresh_tokens,
            refresh_token_lifetime,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock, e.g. with a `ManualClock` in tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Authenticate a principal and start a new session chain
    ///
    /// # Errors
    /// - `InvalidCredentials` if the username/secret pair does not match;
    ///   the error does not say which half was wrong
    /// - store errors from persisting the refresh token
    pub async fn login(&self, username: &str, secret: &str) -> Result<TokenPair, AppError> {
        let context = ErrorContext::new("login");

        let principal = match self.credentials.authenticate(username, secret) {
            Some(principal) => principal,
            None => {
                let err = AppError::Auth(AuthError::InvalidCredentials);
                context.log_error(&err);
                return Err(err);
            }
        };

        let pair = self.issue_pair(principal, self.clock.now()).await?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %principal.username,
            "User logged in successfully"
        );
        Ok(pair)
    }

    /// Redeem a refresh token for a new token pair (token rotation)
    ///
    /// The presented token is retired before its successor is issued, so it can
    /// never be redeemed twice. When several callers present the same token at
    /// once, only the one whose revoke actually removes it succeeds.
    ///
    /// # Errors
    /// - `InvalidOrExpiredRefreshToken` if the token is unknown, expired
    ///   (`expires_at <= now`), or already consumed
    /// - `PrincipalMissing` if the token's principal is no longer configured
    /// - store errors
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let context = ErrorContext::new("token_refresh");
        let now = self.clock.now();

        let record = match self.refresh_tokens.get(refresh_token).await? {
            Some(record) if !record.is_expired_at(now) => record,
            // Expired entries are left in place for housekeeping
            _ => {
                let err = AppError::Auth(AuthError::InvalidOrExpiredRefreshToken);
                context.log_error(&err);
                return Err(err);
            }
        };
        let context = context.with_user_id(record.identity.clone());

        // Retire the presented token; losing this race means someone else rotated it
        if !self.refresh_tokens.revoke(refresh_token).await? {
            tracing::warn!(
                request_id = %context.request_id,
                user_id = %record.identity,
                "Refresh token consumed concurrently"
            );
            return Err(AuthError::InvalidOrExpiredRefreshToken.into());
        }

        let principal = match self.credentials.find(&record.identity) {
            Some(principal) => principal,
            None => {
                let err = AppError::Config(ConfigError::PrincipalMissing(record.identity.clone()));
                context.log_error(&err);
                return Err(err);
            }
        };

        let pair = self.issue_pair(principal, self.clock.now()).await?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %principal.username,
            "Token refreshed successfully"
        );
        Ok(pair)
    }

    /// Revoke a refresh token
    ///
    /// Idempotent: an unknown or already revoked token is not an error.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AppError> {
        let removed = self.refresh_tokens.revoke(refresh_token).await?;
        tracing::info!(removed = removed, "Refresh token revoked");
        Ok(())
    }

    /// Revoke every refresh token issued to `username` (logout everywhere)
    pub async fn revoke_all(&self, username: &str) -> Result<usize, AppError> {
        let removed = self.refresh_tokens.revoke_all(username).await?;
        tracing::info!(user_id = %username, removed = removed, "All refresh tokens revoked for user");
        Ok(removed)
    }

    /// Drop expired refresh tokens from the store
    pub async fn purge_expired(&self) -> Result<usize, AppError> {
        let removed = self.refresh_tokens.purge_expired(self.clock.now()).await?;
        if removed > 0 {
            tracing::debug!(removed = removed, "Expired refresh tokens purged");
        }
        Ok(removed)
    }

    async fn issue_pair(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AppError> {
        let (access_token, expires_at) =
            self.signer
                .issue_access_token(&principal.username, &principal.roles, now)?;
        let refresh_token = self.signer.issue_refresh_token();
        let refresh_expires_at = now
            .checked_add_signed(self.refresh_token_lifetime)
            .ok_or_else(|| AppError::Internal("Refresh token expiry out of range".to_string()))?;

        self.refresh_tokens
            .store(&refresh_token, &principal.username, refresh_expires_at)
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_at,
        })
    }
}
