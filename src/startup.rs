use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::auth::{AuthService, CredentialStore, InMemoryRefreshTokenStore, TokenSigner};
use crate::configuration::{HousekeepingSettings, Settings};
use crate::error::AppError;

/// Wire the auth subsystem from settings
///
/// Fails hard on missing key material or invalid lifetimes so that a
/// misconfigured process never starts serving.
pub fn build_auth_service(settings: &Settings) -> Result<AuthService, AppError> {
    let signer = TokenSigner::new(&settings.jwt)?;
    let refresh_token_lifetime = settings.jwt.refresh_token_lifetime()?;

    let credentials = CredentialStore::new(settings.principals.clone());
    if credentials.is_empty() {
        tracing::warn!("No principals configured, every login will fail");
    }

    tracing::info!(
        principals = credentials.len(),
        issuer = %settings.jwt.issuer,
        audience = %settings.jwt.audience,
        access_token_minutes = settings.jwt.access_token_minutes,
        refresh_token_days = settings.jwt.refresh_token_days,
        "Auth service configured"
    );

    Ok(AuthService::new(
        Arc::new(credentials),
        signer,
        Arc::new(InMemoryRefreshTokenStore::new()),
        refresh_token_lifetime,
    ))
}

/// Periodically purge expired refresh tokens
///
/// Returns `None` when the interval is 0. Failures are logged and the task
/// keeps running; correctness never depends on it.
pub fn spawn_housekeeping(
    service: AuthService,
    settings: &HousekeepingSettings,
) -> Option<JoinHandle<()>> {
    if settings.purge_interval_seconds == 0 {
        tracing::info!("Refresh token housekeeping disabled");
        return None;
    }

    let period = Duration::from_secs(settings.purge_interval_seconds);
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = service.purge_expired().await {
                tracing::error!(error = %e, "Refresh token purge failed");
            }
        }
    }))
}
