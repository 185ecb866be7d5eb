#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the spotilink application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod models;
pub mod pkce;
pub mod session;
pub mod settings;
pub mod spotify;
pub mod storage;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use handlers::{exchange_token, health, refresh_token, request_auth_url};
pub use session::{AuthError, AuthSession, SessionStatus};
pub use settings::SpotilinkSettings;
pub use spotify::{GatewayError, HttpGateway, ProviderGateway};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
