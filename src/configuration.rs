use crate::auth::Principal;
use crate::error::{AppError, ConfigError};

/// Upper bound for `jwt.access_token_minutes` (one day)
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 24 * 60;
/// Upper bound for `jwt.refresh_token_days`
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub jwt: JwtSettings,
    #[serde(default)]
    pub housekeeping: HousekeepingSettings,
    /// Fixed principal list, loaded once at startup
    #[serde(default)]
    pub principals: Vec<Principal>,
}

/// JWT signing and token lifetime settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub issuer: String,
    pub audience: String,
    /// Symmetric signing key (HS256)
    pub secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
}

impl JwtSettings {
    /// Access token lifetime, validated to `1..=MAX_ACCESS_TOKEN_MINUTES`
    pub fn access_token_lifetime(&self) -> Result<chrono::Duration, AppError> {
        bounded_lifetime(
            "jwt.access_token_minutes",
            self.access_token_minutes,
            MAX_ACCESS_TOKEN_MINUTES,
            chrono::Duration::try_minutes,
        )
    }

    /// Refresh token lifetime, validated to `1..=MAX_REFRESH_TOKEN_DAYS`
    pub fn refresh_token_lifetime(&self) -> Result<chrono::Duration, AppError> {
        bounded_lifetime(
            "jwt.refresh_token_days",
            self.refresh_token_days,
            MAX_REFRESH_TOKEN_DAYS,
            chrono::Duration::try_days,
        )
    }
}

fn bounded_lifetime(
    field: &str,
    value: i64,
    max: i64,
    to_duration: fn(i64) -> Option<chrono::Duration>,
) -> Result<chrono::Duration, AppError> {
    if value <= 0 || value > max {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be between 1 and {}, got {}",
            field, max, value
        ))
        .into());
    }
    to_duration(value).ok_or_else(|| {
        ConfigError::InvalidValue(format!("{} is out of range: {}", field, value)).into()
    })
}

// Keeps the signing key out of logs
impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("secret", &"[redacted]")
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .finish()
    }
}

/// Background cleanup of expired refresh tokens
#[derive(serde::Deserialize, Clone, Debug)]
pub struct HousekeepingSettings {
    /// 0 disables the purge task
    #[serde(default = "default_purge_interval_seconds")]
    pub purge_interval_seconds: u64,
}

impl Default for HousekeepingSettings {
    fn default() -> Self {
        Self {
            purge_interval_seconds: default_purge_interval_seconds(),
        }
    }
}

fn default_access_token_minutes() -> i64 {
    30
}

fn default_refresh_token_days() -> i64 {
    7
}

fn default_purge_interval_seconds() -> u64 {
    300
}

/// Load settings from `configuration.{yaml,toml,json}` and `APP__*` environment variables.
///
/// Environment variables win over the file, e.g. `APP__JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, AppError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;
    Ok(settings.try_deserialize::<Settings>()?)
}
