//! Server-side client for the provider's accounts service
//!
//! Used by the intermediary only. Holds the client id and redirect URI, builds
//! the authorization URL and form-POSTs the token grants.

use crate::session::AuthError;
use crate::settings::SpotilinkSettings;
use crate::spotify::gateway::{decode_response, GatewayError};
use crate::utils::logging::LoggingHelper;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Scopes requested for playlist creation
pub const DEFAULT_SCOPES: &str =
    "user-read-email user-read-private playlist-modify-public playlist-modify-private";

#[derive(Debug, Clone)]
pub struct AccountsClient {
    http_client: Client,
    client_id: String,
    redirect_uri: String,
    authorize_url: String,
    token_url: String,
    scopes: String,
}

impl AccountsClient {
    /// Build the accounts client from validated settings
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigMissing`] naming the first missing
    /// credential (`SPOTIFY_CLIENT_ID` or `SPOTIFY_REDIRECT_URI`).
    pub fn from_settings(settings: &SpotilinkSettings) -> Result<Self, AuthError> {
        settings.validate_gateway()?;
        Ok(Self {
            http_client: Client::new(),
            client_id: settings.spotify.client_id.trim().to_string(),
            redirect_uri: settings.spotify.redirect_uri.trim().to_string(),
            authorize_url: settings.spotify.authorize_url.clone(),
            token_url: settings.spotify.token_url.clone(),
            scopes: settings.spotify.scopes.clone(),
        })
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authorization URL for an S256 `code_challenge`
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authorize URL is not a valid URL.
    pub fn build_authorize_url(&self, code_challenge: &str) -> Result<String, url::ParseError> {
        let url = Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_challenge_method", crate::pkce::CHALLENGE_METHOD),
                ("code_challenge", code_challenge),
                ("scope", self.scopes.as_str()),
            ],
        )?;
        Ok(url.into())
    }

    /// Redeem an authorization code; returns the token endpoint's JSON unchanged
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint is unreachable or rejects the grant.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Value, GatewayError> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", self.redirect_uri.as_str());
        params.insert("client_id", self.client_id.as_str());
        params.insert("code_verifier", code_verifier);

        LoggingHelper::log_token_grant("authorization_code", &self.token_url);
        self.post_token_form(&params).await
    }

    /// Redeem a refresh token; returns the token endpoint's JSON unchanged
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint is unreachable or rejects the grant.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Value, GatewayError> {
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", self.client_id.as_str());

        LoggingHelper::log_token_grant("refresh_token", &self.token_url);
        self.post_token_form(&params).await
    }

    async fn post_token_form(&self, params: &HashMap<&str, &str>) -> Result<Value, GatewayError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        decode_response(response).await
    }
}
