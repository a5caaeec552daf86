/// Credential Store
///
/// A fixed list of known principals, built once at startup and shared
/// read-only. Usernames match case-insensitively, secrets exactly.

use serde::Deserialize;
use std::fmt;

/// An authenticatable identity with its roles
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub secret: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(username: impl Into<String>, secret: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn matches_username(&self, username: &str) -> bool {
        self.username.to_lowercase() == username.to_lowercase()
    }
}

// Never print the secret
impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("username", &self.username)
            .field("secret", &"[redacted]")
            .field("roles", &self.roles)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    principals: Vec<Principal>,
}

impl CredentialStore {
    pub fn new(principals: Vec<Principal>) -> Self {
        Self { principals }
    }

    /// Find the principal matching both username and secret
    ///
    /// The first matching entry wins when the list holds duplicates.
    pub fn authenticate(&self, username: &str, secret: &str) -> Option<&Principal> {
        self.principals
            .iter()
            .find(|p| p.matches_username(username) && p.secret == secret)
    }

    /// Look up a principal by username alone
    pub fn find(&self, username: &str) -> Option<&Principal> {
        self.principals.iter().find(|p| p.matches_username(username))
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}
