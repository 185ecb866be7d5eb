use crate::session::AuthError;
use crate::spotify::DEFAULT_SCOPES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Failure loading `Settings.toml`
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: basic_toml::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpotilinkSettings {
    pub application: ApplicationSettings,
    pub spotify: SpotifySettings,
    pub client: ClientSettings,
    pub logging: LoggingSettings,
}

/// Intermediary server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

/// Provider credentials and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifySettings {
    pub client_id: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub scopes: String,
}

/// Settings for the command-line client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Origin of the intermediary the client talks to
    pub gateway_url: String,
    /// Directory holding the persisted session documents
    pub state_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            cors_origins: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            redirect_uri: String::new(),
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base_url: "https://api.spotify.com".to_string(),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:3001".to_string(),
            state_dir: ".spotilink".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Initialize the `env_logger` backend
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. Calling this
/// more than once is harmless.
pub fn init_logging(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    // A logger may already be installed (tests, repeated init)
    let _ = env_logger::Builder::from_env(env).try_init();
}

impl SpotilinkSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `SPOTILINK_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed
    fn load_base_settings() -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("SPOTILINK_SECRETS_DIR") {
            let secrets_path = PathBuf::from(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ SPOTILINK_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a `Settings.toml` file; sections and keys it omits keep their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &std::path::Path) -> Result<Self, SettingsError> {
        let toml_content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        basic_toml::from_str(&toml_content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_spotify_env_overrides(&mut settings.spotify);
        Self::apply_client_env_overrides(&mut settings.client);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for application settings
    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        Self::apply_string_env_override("HOST", &mut app_settings.host);
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        Self::apply_string_env_override("CORS_ORIGINS", &mut app_settings.cors_origins);
    }

    /// Apply environment overrides for provider settings
    pub fn apply_spotify_env_overrides(spotify_settings: &mut SpotifySettings) {
        Self::apply_string_env_override("SPOTIFY_CLIENT_ID", &mut spotify_settings.client_id);
        Self::apply_string_env_override("SPOTIFY_REDIRECT_URI", &mut spotify_settings.redirect_uri);
        Self::apply_string_env_override("SPOTIFY_AUTHORIZE_URL", &mut spotify_settings.authorize_url);
        Self::apply_string_env_override("SPOTIFY_TOKEN_URL", &mut spotify_settings.token_url);
        Self::apply_string_env_override("SPOTIFY_API_BASE_URL", &mut spotify_settings.api_base_url);
    }

    /// Apply environment overrides for client settings
    pub fn apply_client_env_overrides(client_settings: &mut ClientSettings) {
        Self::apply_string_env_override("SPOTILINK_GATEWAY_URL", &mut client_settings.gateway_url);
        Self::apply_string_env_override("SPOTILINK_STATE_DIR", &mut client_settings.state_dir);
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        Self::apply_string_env_override("RUST_LOG", &mut logging_settings.level);
    }

    /// Helper function to apply a non-empty string environment variable
    fn apply_string_env_override(env_var: &str, target: &mut String) {
        if let Ok(value) = std::env::var(env_var) {
            if !value.trim().is_empty() {
                *target = value;
            }
        }
    }

    /// Load environment variables from a `.env` file in the working directory
    ///
    /// Variables already present in the environment are left alone.
    fn load_env_file() {
        match dotenvy::dotenv() {
            Ok(path) => println!("✓ Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => println!("⚠ Ignoring unreadable .env file: {err}"),
        }
    }

    /// Check the intermediary has the credentials it needs before serving
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigMissing`] naming the first missing variable
    pub fn validate_gateway(&self) -> Result<(), AuthError> {
        if self.spotify.client_id.trim().is_empty() {
            return Err(AuthError::ConfigMissing("SPOTIFY_CLIENT_ID".to_string()));
        }
        if self.spotify.redirect_uri.trim().is_empty() {
            return Err(AuthError::ConfigMissing("SPOTIFY_REDIRECT_URI".to_string()));
        }
        Ok(())
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Directory the client persists its session into
    #[must_use]
    pub fn get_state_dir(&self) -> PathBuf {
        PathBuf::from(&self.client.state_dir)
    }
}
