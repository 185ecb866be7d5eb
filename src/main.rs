#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use spotilink::{
    handlers::configure_services,
    settings::{init_logging, SpotilinkSettings},
    spotify::AccountsClient,
    utils::logging::LoggingHelper,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml, .env and environment variables
    let settings = SpotilinkSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;
    init_logging(&settings.logging.level);

    // Credentials are required before any request is served
    let accounts = AccountsClient::from_settings(&settings)
        .map_err(|e| std::io::Error::other(format!("Invalid gateway configuration: {e}")))?;
    LoggingHelper::log_gateway_config(
        accounts.client_id(),
        &settings.spotify.redirect_uri,
        &settings.spotify.scopes,
    );

    start_server(accounts, &settings).await
}

/// Start the intermediary server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(accounts: AccountsClient, settings: &SpotilinkSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, settings);

    let accounts = web::Data::new(accounts);
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Accept"])
            .max_age(3600);

        App::new()
            .app_data(accounts.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &SpotilinkSettings) {
    println!("Starting Spotilink gateway on http://{bind_address}");
    println!();
    println!("Token endpoints:");
    println!("  POST /api/spotify/auth    - Build authorization URL from a code challenge");
    println!("  POST /api/spotify/token   - Exchange authorization code for tokens");
    println!("  POST /api/spotify/refresh - Refresh an access token");
    println!();
    println!("Redirect URI registered with Spotify:");
    println!("  {}", settings.spotify.redirect_uri);
    println!();
    println!("System endpoints:");
    println!("  GET  /ping                - Health check");
}
