use crate::session::clock::Clock;
use crate::session::error::AuthError;
use crate::session::SessionStatus;
use crate::spotify::TokenResponse;
use crate::storage::{KeyValueStore, StorageError};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Storage key of the persisted token set
pub const TOKEN_STORAGE_KEY: &str = "spotify-storage";

/// Access tokens are treated as expired this long before their real expiry
pub const EXPIRY_BUFFER_MS: i64 = 60_000;

/// Tokens for the authenticated user
///
/// This is exactly the persisted subset of the session; transient state
/// lives elsewhere.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Holder of the current [`TokenSet`]
///
/// Mutations are in-memory until [`TokenVault::commit`] writes them out.
pub struct TokenVault<S, C> {
    tokens: Option<TokenSet>,
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S: KeyValueStore, C: Clock> TokenVault<S, C> {
    /// Create an empty vault; call [`TokenVault::load`] to restore persisted state
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            tokens: None,
            store,
            clock,
        }
    }

    /// Replace the in-memory state with whatever was last committed
    ///
    /// An unreadable document is logged and treated as no tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the store cannot be read.
    pub fn load(&mut self) -> Result<(), AuthError> {
        self.tokens = match self.store.get(TOKEN_STORAGE_KEY)? {
            None => None,
            Some(raw) => match serde_json::from_str::<TokenSet>(&raw) {
                Ok(tokens) => Some(tokens),
                Err(err) => {
                    warn!("Ignoring unreadable persisted tokens: {err}");
                    None
                }
            },
        };
        debug!("Loaded token vault (present: {})", self.tokens.is_some());
        Ok(())
    }

    #[must_use]
    pub fn get(&self) -> Option<&TokenSet> {
        self.tokens.as_ref()
    }

    /// Install tokens from a token endpoint response
    ///
    /// `expires_at` is computed from the current time. When the response has
    /// no refresh token the previous one is kept, and when `user_id` is `None`
    /// the previous user id is kept.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoRefreshToken`] if neither the response nor the
    /// current token set provides a refresh token. The vault is unchanged.
    pub fn set(&mut self, response: &TokenResponse, user_id: Option<String>) -> Result<(), AuthError> {
        let previous = self.tokens.as_ref();
        let refresh_token = response
            .refresh_token
            .clone()
            .or_else(|| previous.map(|t| t.refresh_token.clone()))
            .ok_or(AuthError::NoRefreshToken)?;
        let user_id = user_id.or_else(|| previous.and_then(|t| t.user_id.clone()));

        self.tokens = Some(TokenSet {
            access_token: response.access_token.clone(),
            refresh_token,
            expires_at: expiry_from(self.clock.now(), response.expires_in),
            user_id,
        });
        Ok(())
    }

    /// [`TokenVault::set`] followed by [`TokenVault::commit`]
    ///
    /// The new tokens stay in memory only if they were written out; on a
    /// failed write the previous token set is restored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoRefreshToken`] as [`TokenVault::set`] does and
    /// [`AuthError::Storage`] if the store cannot be written.
    pub fn install(&mut self, response: &TokenResponse, user_id: Option<String>) -> Result<(), AuthError> {
        let previous = self.tokens.clone();
        self.set(response, user_id)?;
        if let Err(err) = self.commit() {
            self.tokens = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Drop the token set; clearing an empty vault is a no-op
    pub fn clear(&mut self) {
        self.tokens = None;
    }

    /// True when there are no tokens or the access token is within
    /// [`EXPIRY_BUFFER_MS`] of expiring
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match &self.tokens {
            None => true,
            Some(tokens) => {
                let deadline = tokens.expires_at - TimeDelta::milliseconds(EXPIRY_BUFFER_MS);
                self.clock.now() >= deadline
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self.tokens {
            None => SessionStatus::Unauthenticated,
            Some(_) if self.is_expired() => SessionStatus::Expired,
            Some(_) => SessionStatus::Authenticated,
        }
    }

    /// Persist the current state; an empty vault removes the stored document
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the store cannot be written.
    pub fn commit(&self) -> Result<(), AuthError> {
        match &self.tokens {
            Some(tokens) => {
                let json = serde_json::to_string(tokens).map_err(|source| StorageError::Serialize {
                    key: TOKEN_STORAGE_KEY.to_string(),
                    source,
                })?;
                self.store.set(TOKEN_STORAGE_KEY, &json)?;
            }
            None => self.store.remove(TOKEN_STORAGE_KEY)?,
        }
        Ok(())
    }
}

fn expiry_from(now: DateTime<Utc>, expires_in: u64) -> DateTime<Utc> {
    i64::try_from(expires_in)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
