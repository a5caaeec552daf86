/// JWT Claims structure
///
/// Represents the payload of an access token: the principal's identity and
/// roles plus the standard JWT claims (RFC 7519).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (principal username)
    pub sub: String,
    /// Roles granted to the principal
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Token ID, unique per issued token
    pub jti: String,
}

impl Claims {
    /// Create new claims for a principal
    ///
    /// # Arguments
    /// * `identity` - Principal username
    /// * `roles` - Roles to embed
    /// * `issued_at` - Issue instant
    /// * `expires_at` - Expiry instant
    /// * `issuer` - Issuer identifier
    /// * `audience` - Audience identifier
    pub fn new(
        identity: &str,
        roles: &[String],
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        issuer: &str,
        audience: &str,
    ) -> Self {
        Self {
            sub: identity.to_string(),
            roles: roles.to_vec(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Whether the token grants `role` (exact match)
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
