//! Testing utilities shared by unit and integration tests
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built tokens, profiles, playlists and settings
//! - [`mock`] - `MockGateway` with scripted responses, `ManualClock` and `FailingStore`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use spotilink::testing::{MockGateway, ManualClock};
//! use spotilink::{AuthSession, MemoryStore};
//! use std::sync::Arc;
//!
//! let gateway = MockGateway::new();
//! let session = AuthSession::new(
//!     gateway.clone(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(ManualClock::default()),
//! );
//! assert!(session.tokens().is_none());
//! ```

pub mod fixtures;
pub mod mock;

// Re-export commonly used items for convenience
pub use mock::{FailingStore, GatewayCall, ManualClock, MockGateway};
