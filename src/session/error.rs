use crate::storage::StorageError;
use thiserror::Error;

/// Failures surfaced by session operations
///
/// Every variant carries a human-readable message so the last failure can be
/// kept on the session and rendered later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing required configuration: {0}")]
    ConfigMissing(String),
    #[error("failed to get authorization URL: {0}")]
    AuthUrl(String),
    #[error("no code verifier found; start the login again")]
    VerifierMissing,
    #[error("code verifier expired; start the login again")]
    VerifierExpired,
    #[error("failed to exchange authorization code: {0}")]
    ExchangeFailed(String),
    #[error("failed to fetch user profile: {0}")]
    ProfileFetchFailed(String),
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("failed to refresh token: {0}")]
    RefreshFailed(String),
    #[error("not authenticated")]
    AuthenticationRequired,
    #[error("failed to create playlist: {0}")]
    PlaylistCreationFailed(String),
    #[error("session storage failed: {0}")]
    Storage(String),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
