/// Authentication module
///
/// Credential lookup, access token signing/validation, refresh token storage,
/// and the orchestrator tying them together.

mod claims;
mod clock;
mod credentials;
mod jwt;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialStore, Principal};
pub use jwt::{TokenSigner, REFRESH_TOKEN_LENGTH};
pub use refresh_token::{InMemoryRefreshTokenStore, RefreshTokenRecord, RefreshTokenStore};
pub use service::{AuthService, TokenPair};
