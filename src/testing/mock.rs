//! Fake implementations of the session's collaborators
//!
//! [`MockGateway`] answers from scripted responses and records every call in
//! order; [`ManualClock`] only moves when told to. [`FailingStore`] rejects
//! writes to chosen keys.

use crate::pkce::CodeVerifier;
use crate::session::Clock;
use crate::spotify::{GatewayError, NewPlaylist, Playlist, ProviderGateway, TokenResponse, UserProfile};
use crate::storage::{KeyValueStore, MemoryStore, StorageError};
use crate::testing::fixtures;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// 2025-06-01T12:00:00Z
    pub const DEFAULT_EPOCH_SECS: i64 = 1_748_779_200;

    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::from_timestamp(Self::DEFAULT_EPOCH_SECS, 0).unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory store whose writes to selected keys fail
///
/// Reads and removals always succeed, so a session can still clear itself.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing_keys: Mutex<HashSet<String>>,
}

impl FailingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `set` of `key` fail with an I/O error
    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let failing = self
            .failing_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key);
        if failing {
            return Err(StorageError::Io {
                key: key.to_string(),
                source: io::Error::other("no space left on device"),
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

/// One recorded [`ProviderGateway`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    AuthorizeUrl {
        code_challenge: String,
    },
    ExchangeCode {
        code: String,
        code_verifier: String,
    },
    RefreshToken {
        refresh_token: String,
    },
    FetchProfile {
        access_token: String,
    },
    CreatePlaylist {
        access_token: String,
        user_id: String,
        playlist: NewPlaylist,
    },
}

struct MockState {
    calls: Vec<GatewayCall>,
    authorize_error: Option<GatewayError>,
    exchange: Result<TokenResponse, GatewayError>,
    refresh: Result<TokenResponse, GatewayError>,
    profile: Result<UserProfile, GatewayError>,
    create_failures: VecDeque<GatewayError>,
}

/// Scripted [`ProviderGateway`]
///
/// Clones share state, so a test can keep a handle after moving one into a
/// session. By default every call succeeds with the values in [`fixtures`].
#[derive(Clone)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                calls: Vec::new(),
                authorize_error: None,
                exchange: Ok(fixtures::login_token_response()),
                refresh: Ok(fixtures::token_response("refreshed-access-token", None, 3600)),
                profile: Ok(fixtures::user_profile()),
                create_failures: VecDeque::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_authorize_url(&self, err: GatewayError) {
        self.state().authorize_error = Some(err);
    }

    pub fn set_exchange_response(&self, response: TokenResponse) {
        self.state().exchange = Ok(response);
    }

    pub fn fail_exchange(&self, err: GatewayError) {
        self.state().exchange = Err(err);
    }

    pub fn set_refresh_response(&self, response: TokenResponse) {
        self.state().refresh = Ok(response);
    }

    pub fn fail_refresh(&self, err: GatewayError) {
        self.state().refresh = Err(err);
    }

    pub fn fail_profile(&self, err: GatewayError) {
        self.state().profile = Err(err);
    }

    /// Make the next playlist creation fail; queued failures are used in order
    pub fn push_create_playlist_failure(&self, err: GatewayError) {
        self.state().create_failures.push_back(err);
    }

    /// Calls recorded so far, oldest first
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

#[async_trait]
impl ProviderGateway for MockGateway {
    async fn authorize_url(&self, code_challenge: &str) -> Result<String, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::AuthorizeUrl {
            code_challenge: code_challenge.to_string(),
        });
        match &state.authorize_error {
            Some(err) => Err(err.clone()),
            None => Ok(format!(
                "https://accounts.spotify.com/authorize?client_id={}&response_type=code&code_challenge_method=S256&code_challenge={code_challenge}",
                fixtures::CLIENT_ID
            )),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &CodeVerifier,
    ) -> Result<TokenResponse, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::ExchangeCode {
            code: code.to_string(),
            code_verifier: verifier.as_str().to_string(),
        });
        state.exchange.clone()
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::RefreshToken {
            refresh_token: refresh_token.to_string(),
        });
        state.refresh.clone()
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::FetchProfile {
            access_token: access_token.to_string(),
        });
        state.profile.clone()
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<Playlist, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall::CreatePlaylist {
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
            playlist: playlist.clone(),
        });
        match state.create_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(fixtures::playlist(&playlist.name, &playlist.description)),
        }
    }
}
