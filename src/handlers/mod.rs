// HTTP request handlers for the intermediary
pub mod gateway;
pub mod health;

use actix_web::web;

// Re-export the main handler functions
pub use gateway::{exchange_token, refresh_token, request_auth_url};
pub use health::health;

/// Register every intermediary route
///
/// Handlers expect a `web::Data<AccountsClient>` registered on the app.
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg
        // Token-side operations
        .route("/api/spotify/auth", web::post().to(request_auth_url))
        .route("/api/spotify/token", web::post().to(exchange_token))
        .route("/api/spotify/refresh", web::post().to(refresh_token))
        // Health endpoint
        .route("/ping", web::get().to(health));
}
