//! Remote boundary of the session
//!
//! Token-side calls (authorize URL, code exchange, refresh) go through the
//! trusted intermediary so the client id and redirect URI never leave the
//! server. Profile and playlist calls go straight to the provider REST API
//! with a bearer token.

use crate::pkce::CodeVerifier;
use crate::session::AuthError;
use crate::settings::SpotilinkSettings;
use crate::spotify::types::{
    AuthUrlRequest, AuthUrlResponse, NewPlaylist, Playlist, RefreshRequest, TokenRequest,
    TokenResponse, UserProfile,
};
use crate::utils::logging::LoggingHelper;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Failure talking to the intermediary or the provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether the remote side rejected the bearer token
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }

    /// Message suitable for showing to the user
    ///
    /// For status failures this is the provider's own message (or the status
    /// text when it sent none).
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// The five remote operations the session depends on
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Ask the intermediary for the provider authorization URL
    ///
    /// # Errors
    ///
    /// Returns an error if the intermediary is unreachable or rejects the challenge.
    async fn authorize_url(&self, code_challenge: &str) -> Result<String, GatewayError>;

    /// Exchange an authorization code and its verifier for tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange is rejected or the response is malformed.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &CodeVerifier,
    ) -> Result<TokenResponse, GatewayError>;

    /// Obtain a new access token from a refresh token
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh is rejected or the response is malformed.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, GatewayError>;

    /// Fetch the profile of the user owning `access_token`
    ///
    /// # Errors
    ///
    /// Returns an error on any non-success response.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, GatewayError>;

    /// Create a playlist owned by `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error on any non-success response; the message is the
    /// provider's `error.message` when present.
    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<Playlist, GatewayError>;
}

/// reqwest-backed [`ProviderGateway`]
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    gateway_url: String,
    api_base_url: String,
}

impl HttpGateway {
    /// Create a gateway client
    ///
    /// `gateway_url` is the intermediary origin, `api_base_url` the provider
    /// REST API origin (without the `/v1` suffix).
    #[must_use]
    pub fn new(gateway_url: &str, api_base_url: &str) -> Self {
        Self::with_client(Client::new(), gateway_url, api_base_url)
    }

    #[must_use]
    pub fn with_client(client: Client, gateway_url: &str, api_base_url: &str) -> Self {
        Self {
            client,
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a gateway client from the `[client]` and `[spotify]` settings
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigMissing`] if the intermediary or API URL is
    /// empty or not an absolute URL.
    pub fn from_settings(settings: &SpotilinkSettings) -> Result<Self, AuthError> {
        let gateway_url = settings.client.gateway_url.trim();
        if gateway_url.is_empty() || Url::parse(gateway_url).is_err() {
            return Err(AuthError::ConfigMissing("SPOTILINK_GATEWAY_URL".to_string()));
        }
        let api_base_url = settings.spotify.api_base_url.trim();
        if api_base_url.is_empty() || Url::parse(api_base_url).is_err() {
            return Err(AuthError::ConfigMissing("SPOTIFY_API_BASE_URL".to_string()));
        }
        Ok(Self::new(gateway_url, api_base_url))
    }

    #[must_use]
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    #[must_use]
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn gateway_endpoint(&self, route: &str) -> String {
        format!("{}/api/spotify/{route}", self.gateway_url)
    }

    fn api_endpoint(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.api_base_url)
    }
}

#[async_trait]
impl ProviderGateway for HttpGateway {
    async fn authorize_url(&self, code_challenge: &str) -> Result<String, GatewayError> {
        let body = AuthUrlRequest {
            code_challenge: Some(code_challenge.to_string()),
        };
        let response = self
            .client
            .post(self.gateway_endpoint("auth"))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let AuthUrlResponse { url } = decode_response(response).await?;
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &CodeVerifier,
    ) -> Result<TokenResponse, GatewayError> {
        let body = TokenRequest {
            code: Some(code.to_string()),
            code_verifier: Some(verifier.as_str().to_string()),
        };
        let response = self
            .client
            .post(self.gateway_endpoint("token"))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        decode_response(response).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, GatewayError> {
        let body = RefreshRequest {
            refresh_token: Some(refresh_token.to_string()),
        };
        let response = self
            .client
            .post(self.gateway_endpoint("refresh"))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        decode_response(response).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, GatewayError> {
        let response = self
            .client
            .get(self.api_endpoint("me"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport_error)?;

        decode_response(response).await
    }

    async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        playlist: &NewPlaylist,
    ) -> Result<Playlist, GatewayError> {
        let mut endpoint = Url::parse(&self.api_endpoint("users"))
            .map_err(|e| GatewayError::Transport(format!("invalid API URL: {e}")))?;
        // Push the user id as a path segment so it is percent-encoded
        endpoint
            .path_segments_mut()
            .map_err(|()| GatewayError::Transport("API URL cannot be a base".to_string()))?
            .push(user_id)
            .push("playlists");

        LoggingHelper::log_playlist_request(endpoint.as_str(), &playlist.name);
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(access_token)
            .json(playlist)
            .send()
            .await
            .map_err(transport_error)?;

        decode_response(response).await
    }
}

#[allow(clippy::needless_pass_by_value)]
fn transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

/// Turn a response into `T`, or into a [`GatewayError::Status`] carrying the
/// remote error message
pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Extract a human-readable message from an error body
///
/// Understands the provider's `{"error":{"message":..}}`, the token
/// endpoint's `{"error":..,"error_description":..}` and the intermediary's
/// `{"error":".."}`. Falls back to the status text.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let from_body = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        let error = json.get("error")?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| json.get("error_description").and_then(Value::as_str))
            .or_else(|| error.as_str())?;
        Some(message.to_string())
    });

    from_body
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| status.as_u16().to_string(), str::to_string)
        })
}
