// Provider integration: accounts service, REST API and the intermediary
pub mod accounts;
pub mod gateway;
pub mod types;

pub use accounts::{AccountsClient, DEFAULT_SCOPES};
pub use gateway::{GatewayError, HttpGateway, ProviderGateway};
pub use types::{NewPlaylist, Playlist, TokenResponse, UserProfile};
