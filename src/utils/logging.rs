// Centralized logging for the login flow and the intermediary.
// Token, code and verifier values are never logged; lengths and presence are.
use crate::session::AuthError;
use crate::spotify::GatewayError;
use log::{debug, info, warn};

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log gateway configuration at startup
    pub fn log_gateway_config(client_id: &str, redirect_uri: &str, scopes: &str) {
        info!(
            "✅ Spotify client configured (client_id: {}…, redirect_uri: {})",
            client_id.chars().take(6).collect::<String>(),
            redirect_uri
        );
        info!("🎯 Requested scopes: {scopes}");
    }

    /// Log an authorization URL handed out by the intermediary
    pub fn log_auth_url_built(challenge_len: usize) {
        info!("🔍 Built Spotify authorization URL (code_challenge: {challenge_len} chars)");
    }

    /// Log a token grant being forwarded to the accounts service
    pub fn log_token_grant(grant_type: &str, token_url: &str) {
        info!("🔄 Forwarding {grant_type} grant to {token_url}");
    }

    /// Log a request the intermediary rejected before contacting the provider
    pub fn log_rejected_request(route: &str, reason: &str) {
        warn!("Rejected {route} request: {reason}");
    }

    /// Log a failed upstream call from an intermediary route
    pub fn log_upstream_failure(route: &str, err: &GatewayError) {
        warn!("❌ Upstream call for {route} failed: {err}");
    }

    /// Log the start of a login attempt
    pub fn log_login_started(verifier_len: usize) {
        info!("🔐 Login started (code_verifier: {verifier_len} chars)");
    }

    /// Log a completed code exchange and profile fetch
    pub fn log_login_completed(user_id: &str, expires_in: u64) {
        info!("Successfully authenticated Spotify user: {user_id} (token valid for {expires_in}s)");
    }

    /// Log a successful token refresh
    pub fn log_token_refreshed(expires_in: u64, refresh_token_rotated: bool) {
        info!(
            "🔄 Access token refreshed (valid for {expires_in}s, refresh_token={})",
            if refresh_token_rotated { "rotated" } else { "kept" }
        );
    }

    /// Log a local logout
    pub fn log_logout() {
        info!("Cleared Spotify session");
    }

    /// Log a playlist creation request
    pub fn log_playlist_request(url: &str, name: &str) {
        debug!("Creating playlist {name:?} via {url}");
    }

    pub fn log_playlist_created(playlist_id: &str) {
        info!("✅ Created playlist {playlist_id}");
    }

    /// Log a failed session operation
    pub fn log_session_failure(err: &AuthError) {
        match err {
            AuthError::VerifierMissing | AuthError::VerifierExpired => {
                info!("Login cannot complete: {err}");
            }
            _ => warn!("Session operation failed: {err}"),
        }
    }
}
