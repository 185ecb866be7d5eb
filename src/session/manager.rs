//! Auth Session - PKCE login flow and token lifecycle
//!
//! `AuthSession` is the only owner of the verifier slot and the token vault.
//! Callers drive it through a handful of async operations and read derived
//! state back through accessors; nothing else mutates stored fields.
//!
//! ## Organization
//!
//! 1. **Transient State** - loading flag and last error, never persisted
//! 2. **Construction** - session creation over a store, clock and gateway
//! 3. **Login Flow** - authorization URL and code exchange
//! 4. **Token Lifecycle** - refresh and logout
//! 5. **Playlists** - playlist creation with refresh-before-use
//! 6. **Accessors** - derived state for rendering

use crate::pkce::{derive_challenge, generate_verifier, CodeVerifier};
use crate::session::clock::Clock;
use crate::session::error::AuthError;
use crate::session::vault::{TokenSet, TokenVault};
use crate::session::verifier::VerifierStore;
use crate::session::SessionStatus;
use crate::spotify::{GatewayError, NewPlaylist, Playlist, ProviderGateway};
use crate::storage::KeyValueStore;
use crate::utils::logging::LoggingHelper;
use log::{debug, warn};
use std::sync::Arc;

/// Name used when the caller leaves the playlist name blank
pub const DEFAULT_PLAYLIST_NAME: &str = "My Playlist";

/// Description used when the caller leaves the playlist description blank
pub const DEFAULT_PLAYLIST_DESCRIPTION: &str = "Created with Spotify Integration";

// =============================================================================
// Transient State
// =============================================================================

/// Per-process state that is never written to storage
#[derive(Debug, Default)]
struct TransientState {
    is_loading: bool,
    last_error: Option<AuthError>,
}

/// Client-side session for one user of the provider
///
/// Mutating operations take `&mut self`; share a session between tasks by
/// wrapping it in a `tokio::sync::Mutex`.
pub struct AuthSession<G, S, C> {
    gateway: G,
    verifier: VerifierStore<S, C>,
    vault: TokenVault<S, C>,
    transient: TransientState,
}

// =============================================================================
// Construction
// =============================================================================

impl<G, S, C> AuthSession<G, S, C>
where
    G: ProviderGateway,
    S: KeyValueStore,
    C: Clock,
{
    /// Create a session and restore any previously committed tokens
    ///
    /// A store that cannot be read is logged and the session starts
    /// unauthenticated.
    pub fn new(gateway: G, store: Arc<S>, clock: Arc<C>) -> Self {
        let mut vault = TokenVault::new(Arc::clone(&store), Arc::clone(&clock));
        if let Err(err) = vault.load() {
            warn!("Starting without persisted tokens: {err}");
        }

        Self {
            gateway,
            verifier: VerifierStore::new(store, clock),
            vault,
            transient: TransientState::default(),
        }
    }

    /// Record a failed operation so the UI can render it later
    fn record<T>(&mut self, result: Result<T, AuthError>) -> Result<T, AuthError> {
        if let Err(err) = &result {
            LoggingHelper::log_session_failure(err);
            self.transient.last_error = Some(err.clone());
        }
        result
    }
}

// =============================================================================
// Login Flow
// =============================================================================

impl<G, S, C> AuthSession<G, S, C>
where
    G: ProviderGateway,
    S: KeyValueStore,
    C: Clock,
{
    /// Start a login: generate and save a fresh verifier, then ask the
    /// intermediary for the authorization URL carrying its challenge
    ///
    /// The saved verifier is left in place on failure; the next attempt
    /// overwrites it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthUrl`] if the intermediary call fails and
    /// [`AuthError::Storage`] if the verifier cannot be saved.
    pub async fn get_auth_url(&mut self) -> Result<String, AuthError> {
        self.transient.last_error = None;
        let result = self.request_auth_url().await;
        self.record(result)
    }

    async fn request_auth_url(&self) -> Result<String, AuthError> {
        let verifier = generate_verifier();
        self.verifier.save(&verifier)?;

        let challenge = derive_challenge(&verifier);
        let url = self
            .gateway
            .authorize_url(&challenge)
            .await
            .map_err(|e| AuthError::AuthUrl(e.user_message()))?;

        LoggingHelper::log_login_started(verifier.len());
        Ok(url)
    }

    /// Complete a login with the authorization code from the redirect
    ///
    /// Tokens and the user id are installed together only after the profile
    /// fetch succeeds, so a failure at any step leaves no new tokens behind.
    /// The verifier is cleared once the exchange succeeded.
    ///
    /// # Errors
    ///
    /// - [`AuthError::VerifierMissing`] / [`AuthError::VerifierExpired`] when
    ///   there is no usable verifier
    /// - [`AuthError::ExchangeFailed`] when the code exchange is rejected
    /// - [`AuthError::ProfileFetchFailed`] when the profile cannot be read
    /// - [`AuthError::Storage`] when the session cannot be persisted
    pub async fn handle_auth_code(&mut self, code: &str) -> Result<(), AuthError> {
        self.transient.last_error = None;
        let verifier = match self.verifier.take_if_fresh() {
            Ok(verifier) => verifier,
            Err(err) => return self.record(Err(err)),
        };

        self.transient.is_loading = true;
        let result = self.complete_login(code, &verifier).await;
        self.transient.is_loading = false;

        self.record(result)
    }

    async fn complete_login(&mut self, code: &str, verifier: &CodeVerifier) -> Result<(), AuthError> {
        let response = self
            .gateway
            .exchange_code(code, verifier)
            .await
            .map_err(|e| AuthError::ExchangeFailed(e.user_message()))?;
        if response.refresh_token.is_none() {
            return Err(AuthError::ExchangeFailed(
                "token response did not include a refresh token".to_string(),
            ));
        }

        // The code and verifier are spent
        self.verifier.clear()?;

        let profile = self
            .gateway
            .fetch_profile(&response.access_token)
            .await
            .map_err(|e| AuthError::ProfileFetchFailed(e.user_message()))?;

        self.vault.install(&response, Some(profile.id.clone()))?;

        LoggingHelper::log_login_completed(&profile.id, response.expires_in);
        Ok(())
    }
}

// =============================================================================
// Token Lifecycle
// =============================================================================

impl<G, S, C> AuthSession<G, S, C>
where
    G: ProviderGateway,
    S: KeyValueStore,
    C: Clock,
{
    /// Replace the access token using the stored refresh token
    ///
    /// On failure the whole session is cleared, persisted state included.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoRefreshToken`] when not logged in and
    /// [`AuthError::RefreshFailed`] when the refresh is rejected or the new
    /// tokens cannot be saved.
    pub async fn refresh_access_token(&mut self) -> Result<(), AuthError> {
        self.transient.last_error = None;
        let result = self.refresh_tokens().await;
        self.record(result)
    }

    async fn refresh_tokens(&mut self) -> Result<(), AuthError> {
        let Some(refresh_token) = self.vault.get().map(|t| t.refresh_token.clone()) else {
            return Err(AuthError::NoRefreshToken);
        };

        let response = match self.gateway.refresh_token(&refresh_token).await {
            Ok(response) => response,
            Err(err) => {
                warn!("Token refresh failed, clearing session");
                self.clear_session_state();
                return Err(AuthError::RefreshFailed(err.user_message()));
            }
        };

        if let Err(err) = self.vault.install(&response, None) {
            warn!("Refreshed tokens could not be saved, clearing session: {err}");
            self.clear_session_state();
            return Err(AuthError::RefreshFailed(err.to_string()));
        }

        LoggingHelper::log_token_refreshed(response.expires_in, response.refresh_token.is_some());
        Ok(())
    }

    /// Log out locally: forget the verifier and tokens and reset the error
    ///
    /// Always succeeds. The provider-side grant is not revoked.
    pub fn clear_auth(&mut self) {
        self.clear_session_state();
        self.transient.last_error = None;
        LoggingHelper::log_logout();
    }

    fn clear_session_state(&mut self) {
        if let Err(err) = self.verifier.clear() {
            warn!("Failed to remove code verifier: {err}");
        }
        self.vault.clear();
        if let Err(err) = self.vault.commit() {
            warn!("Failed to remove persisted tokens: {err}");
        }
    }
}

// =============================================================================
// Playlists
// =============================================================================

impl<G, S, C> AuthSession<G, S, C>
where
    G: ProviderGateway,
    S: KeyValueStore,
    C: Clock,
{
    /// Create a private playlist for the logged-in user
    ///
    /// Blank `name` and `description` fall back to [`DEFAULT_PLAYLIST_NAME`]
    /// and [`DEFAULT_PLAYLIST_DESCRIPTION`]. An expired access token is
    /// refreshed first; otherwise a 401 from the provider triggers one refresh
    /// and one retry.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthenticationRequired`] without an access token and user id
    /// - [`AuthError::RefreshFailed`] / [`AuthError::NoRefreshToken`] from the refresh
    /// - [`AuthError::PlaylistCreationFailed`] with the provider's message
    pub async fn create_playlist(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<Playlist, AuthError> {
        self.transient.last_error = None;
        let result = self.create_playlist_inner(name, description).await;
        self.record(result)
    }

    async fn create_playlist_inner(
        &mut self,
        name: &str,
        description: &str,
    ) -> Result<Playlist, AuthError> {
        if self.vault.get().and_then(|t| t.user_id.as_ref()).is_none() {
            return Err(AuthError::AuthenticationRequired);
        }

        let refreshed = self.vault.is_expired();
        if refreshed {
            debug!("Access token expired, refreshing before creating playlist");
            self.refresh_tokens().await?;
        }

        let playlist = new_playlist(name, description);
        let outcome = match self.send_create_playlist(&playlist).await? {
            Err(err) if err.is_unauthorized() && !refreshed => {
                debug!("Provider rejected the access token, refreshing once and retrying");
                self.refresh_tokens().await?;
                self.send_create_playlist(&playlist).await?
            }
            other => other,
        };

        let created = outcome.map_err(|e| AuthError::PlaylistCreationFailed(e.user_message()))?;
        LoggingHelper::log_playlist_created(&created.id);
        Ok(created)
    }

    /// Send the create request with the current credentials; the outer
    /// result is local state, the inner one the provider's answer
    async fn send_create_playlist(
        &self,
        playlist: &NewPlaylist,
    ) -> Result<Result<Playlist, GatewayError>, AuthError> {
        let Some(TokenSet {
            access_token,
            user_id: Some(user_id),
            ..
        }) = self.vault.get()
        else {
            return Err(AuthError::AuthenticationRequired);
        };

        Ok(self
            .gateway
            .create_playlist(access_token, user_id, playlist)
            .await)
    }
}

/// Trim the user's input and fill in defaults for blank fields
fn new_playlist(name: &str, description: &str) -> NewPlaylist {
    let name = name.trim();
    let description = description.trim();
    NewPlaylist {
        name: if name.is_empty() { DEFAULT_PLAYLIST_NAME } else { name }.to_string(),
        description: if description.is_empty() {
            DEFAULT_PLAYLIST_DESCRIPTION
        } else {
            description
        }
        .to_string(),
        public: false,
    }
}

// =============================================================================
// Accessors
// =============================================================================

impl<G, S, C> AuthSession<G, S, C>
where
    G: ProviderGateway,
    S: KeyValueStore,
    C: Clock,
{
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.vault.status()
    }

    #[must_use]
    pub fn tokens(&self) -> Option<&TokenSet> {
        self.vault.get()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.transient.is_loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&AuthError> {
        self.transient.last_error.as_ref()
    }

    /// Whether a login started less than five minutes ago is waiting for its callback
    #[must_use]
    pub fn has_pending_verifier(&self) -> bool {
        self.verifier.is_pending().unwrap_or_else(|err| {
            warn!("Could not read code verifier slot: {err}");
            false
        })
    }
}
