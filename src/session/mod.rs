//! Client-side session management
//!
//! # Modules
//!
//! - [`manager`] - `AuthSession`, the orchestrator of the PKCE login and token lifecycle
//! - [`verifier`] - persisted slot for the code verifier of the login in flight
//! - [`vault`] - token set storage and expiry detection
//! - [`clock`] - time source used for freshness and expiry checks
//! - [`error`] - error kinds surfaced to callers

pub mod clock;
pub mod error;
pub mod manager;
pub mod vault;
pub mod verifier;

use std::fmt;

// Re-export commonly used items for convenience
pub use clock::{Clock, SystemClock};
pub use error::AuthError;
pub use manager::{AuthSession, DEFAULT_PLAYLIST_DESCRIPTION, DEFAULT_PLAYLIST_NAME};
pub use vault::{TokenSet, TokenVault, EXPIRY_BUFFER_MS, TOKEN_STORAGE_KEY};
pub use verifier::{VerifierStore, VERIFIER_KEY, VERIFIER_MAX_AGE_MS};

/// Authentication state derived from the token set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticated,
    /// Tokens are present but the access token is expired or about to expire
    Expired,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "not connected"),
            Self::Authenticated => write!(f, "connected"),
            Self::Expired => write!(f, "connected (access token expired)"),
        }
    }
}
