#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use spotilink::{
    session::{AuthSession, SessionStatus, SystemClock},
    settings::{init_logging, SpotilinkSettings},
    storage::FileStore,
    HttpGateway,
};
use std::sync::Arc;
use url::Url;

type CliSession = AuthSession<HttpGateway, FileStore, SystemClock>;

#[derive(Parser)]
#[command(name = "spotilink", version, about = "Connect a Spotify account and create playlists")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a login and print the Spotify authorization URL.
    Login,
    /// Finish a login with the code (or full redirect URL) Spotify sent back.
    Callback {
        /// Authorization code, or the redirect URL containing `?code=...`.
        code: String,
    },
    /// Create a private playlist.
    Create {
        #[arg(short, long, default_value = "")]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Force a token refresh.
    Refresh,
    /// Show the connection status.
    Status,
    /// Forget the local session.
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = SpotilinkSettings::load().context("failed to load settings")?;
    init_logging(cli.log_level.as_deref().unwrap_or(&settings.logging.level));

    let gateway = HttpGateway::from_settings(&settings)?;
    let store = Arc::new(FileStore::new(settings.get_state_dir()));
    let mut session = AuthSession::new(gateway, store, Arc::new(SystemClock::new()));

    run(&mut session, cli.command).await
}

async fn run(session: &mut CliSession, command: Commands) -> Result<()> {
    match command {
        Commands::Login => {
            let url = session.get_auth_url().await?;
            println!("Open this URL to connect your Spotify account:");
            println!();
            println!("  {url}");
            println!();
            println!("Then run `spotilink callback <code>` with the code from the redirect.");
        }
        Commands::Callback { code } => {
            let code = extract_code(&code)?;
            if let Err(err) = session.handle_auth_code(&code).await {
                // A failed callback leaves nothing half-connected
                session.clear_auth();
                return Err(err.into());
            }
            print_status(session);
        }
        Commands::Create { name, description } => {
            let playlist = session.create_playlist(&name, &description).await?;
            println!("✓ Created playlist \"{}\" ({})", playlist.name, playlist.id);
            if let Some(url) = playlist.web_url() {
                println!("  {url}");
            }
        }
        Commands::Refresh => {
            session.refresh_access_token().await?;
            print_status(session);
        }
        Commands::Status => print_status(session),
        Commands::Logout => {
            session.clear_auth();
            println!("Disconnected from Spotify.");
        }
    }
    Ok(())
}

/// Accept either a bare code or the whole redirect URL
fn extract_code(input: &str) -> Result<String> {
    let input = input.trim();
    let Ok(url) = Url::parse(input) else {
        return Ok(input.to_string());
    };

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => bail!("authorization was denied: {value}"),
            _ => {}
        }
    }
    code.context("redirect URL has no `code` parameter")
}

fn print_status(session: &CliSession) {
    match session.status() {
        SessionStatus::Unauthenticated if session.has_pending_verifier() => {
            println!("Status: waiting for the authorization callback");
        }
        status => println!("Status: {status}"),
    }
    if let Some(tokens) = session.tokens() {
        if let Some(user_id) = &tokens.user_id {
            println!("User:   {user_id}");
        }
        println!("Token expires at {}", tokens.expires_at.to_rfc3339());
    }
    if let Some(err) = session.last_error() {
        println!("Last error: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_code_from_bare_code() {
        assert_eq!(extract_code("  AQBx-123 ").unwrap(), "AQBx-123");
    }

    #[test]
    fn test_extract_code_from_redirect_url() {
        assert_eq!(
            extract_code("http://localhost:3000/callback?code=AQBx%2D123&state=x").unwrap(),
            "AQBx-123"
        );
    }

    #[test]
    fn test_extract_code_reports_denial() {
        let err = extract_code("http://localhost:3000/callback?error=access_denied").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_cli_parses_create() {
        let cli = Cli::try_parse_from(["spotilink", "create", "--name", "Road Trip"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Create { ref name, ref description } if name == "Road Trip" && description.is_empty()
        ));
    }
}
