//! Pre-built test data: tokens, profiles, playlists and settings

use crate::settings::SpotilinkSettings;
use crate::spotify::types::ExternalUrls;
use crate::spotify::{Playlist, TokenResponse, UserProfile};

/// Access token returned by the default exchange
pub const ACCESS_TOKEN: &str = "BQD-test-access-token";

/// Refresh token returned by the default exchange
pub const REFRESH_TOKEN: &str = "AQD-test-refresh-token";

/// Provider user id of the default profile
pub const USER_ID: &str = "test-user";

/// Id of every playlist the mock creates
pub const PLAYLIST_ID: &str = "3cEYpjA9oz9GiPac4AsH4n";

pub const CLIENT_ID: &str = "test-client-id";

pub const REDIRECT_URI: &str = "http://localhost:3000/callback";

/// Token endpoint response with the given values and a `Bearer` type
#[must_use]
pub fn token_response(access_token: &str, refresh_token: Option<&str>, expires_in: u64) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(ToString::to_string),
        expires_in,
        token_type: Some("Bearer".to_string()),
        scope: Some(crate::spotify::DEFAULT_SCOPES.to_string()),
    }
}

/// Response of a successful first login
#[must_use]
pub fn login_token_response() -> TokenResponse {
    token_response(ACCESS_TOKEN, Some(REFRESH_TOKEN), 3600)
}

#[must_use]
pub fn user_profile() -> UserProfile {
    UserProfile {
        id: USER_ID.to_string(),
        display_name: Some("Test User".to_string()),
        email: Some("test@example.com".to_string()),
    }
}

#[must_use]
pub fn playlist(name: &str, description: &str) -> Playlist {
    Playlist {
        id: PLAYLIST_ID.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        public: Some(false),
        uri: Some(format!("spotify:playlist:{PLAYLIST_ID}")),
        external_urls: Some(ExternalUrls {
            spotify: Some(format!("https://open.spotify.com/playlist/{PLAYLIST_ID}")),
        }),
    }
}

/// Settings with credentials filled in and every remote URL pointed at `server_url`
#[must_use]
pub fn settings_for(server_url: &str) -> SpotilinkSettings {
    let mut settings = SpotilinkSettings::default();
    settings.spotify.client_id = CLIENT_ID.to_string();
    settings.spotify.redirect_uri = REDIRECT_URI.to_string();
    settings.spotify.token_url = format!("{server_url}/api/token");
    settings.spotify.api_base_url = server_url.to_string();
    settings.client.gateway_url = server_url.to_string();
    settings
}
