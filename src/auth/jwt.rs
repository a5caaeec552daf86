/// Token Signing and Validation
///
/// Issues HS256 access tokens and opaque refresh tokens, and validates access
/// tokens with the same key material. Validation needs no store lookup.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError};

/// Length of generated refresh tokens (base62 characters, ~380 bits)
pub const REFRESH_TOKEN_LENGTH: usize = 64;

/// Accepted clock skew when validating `exp`, in seconds
const VALIDATION_LEEWAY_SECONDS: u64 = 60;

/// Signs access tokens and mints refresh tokens
///
/// Key material is fixed at construction; a signer with no key cannot be built.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_lifetime: Duration,
}

impl TokenSigner {
    /// Build a signer from configuration
    ///
    /// # Errors
    /// Returns a configuration error if the signing key, issuer or audience is
    /// empty, or if the access token lifetime is outside its allowed range.
    pub fn new(config: &JwtSettings) -> Result<Self, AppError> {
        if config.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()).into());
        }
        if config.issuer.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.issuer".to_string()).into());
        }
        if config.audience.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.audience".to_string()).into());
        }
        let access_token_lifetime = config.access_token_lifetime()?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_lifetime,
        })
    }

    /// Issue an access token for a principal
    ///
    /// The expiry is exactly `issued_at + access_token_lifetime`.
    ///
    /// # Errors
    /// Returns an internal error if the expiry is not representable or encoding fails
    pub fn issue_access_token(
        &self,
        identity: &str,
        roles: &[String],
        issued_at: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let expires_at = issued_at
            .checked_add_signed(self.access_token_lifetime)
            .ok_or_else(|| AppError::Internal("Access token expiry out of range".to_string()))?;
        let claims = Claims::new(
            identity,
            roles,
            issued_at,
            expires_at,
            &self.issuer,
            &self.audience,
        );

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Generate a new cryptographically secure refresh token
    ///
    /// 64 random base62 characters from the thread-local CSPRNG.
    pub fn issue_refresh_token(&self) -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REFRESH_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    /// Validate and extract claims from an access token
    ///
    /// # Errors
    /// Returns `TokenInvalid` if the token is malformed, tampered with, expired,
    /// or minted for another issuer or audience
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = VALIDATION_LEEWAY_SECONDS;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT validation error: {}", e);
                AppError::Auth(AuthError::TokenInvalid)
            })
    }
}
