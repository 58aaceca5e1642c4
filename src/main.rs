//! GuruTeam Bot - Main Entry Point
//!
//! A Bot Framework chat bot for Microsoft Teams that answers commands,
//! renders charts and keeps each user to one request in flight.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use guruteam_bot::auth::TokenProvider;
use guruteam_bot::channel::ConnectorClient;
use guruteam_bot::commands::CommandHandler;
use guruteam_bot::config::{BotCredentials, BotSettings};
use guruteam_bot::conversation::ConversationCounters;
use guruteam_bot::directory::DirectoryClient;
use guruteam_bot::guard::{ProcessingRegistry, TurnGuard};
use guruteam_bot::server::{AppState, router};

/// Teams bot with charts and single-flight request handling.
#[derive(Parser, Debug)]
#[command(name = "guruteam_bot")]
#[command(about = "Serve the GuruTeam bot messaging endpoint")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Port to listen on; overrides `PORT`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let credentials =
        BotCredentials::from_env().context("Failed to load bot credentials from environment")?;
    let settings = BotSettings::from_env_with_defaults();
    let port = args.port.unwrap_or(settings.port);

    info!("Configuration:");
    info!("   Bot ID: {}", check_mark(credentials.app_id.is_some()));
    info!("   Tenant ID: {}", check_mark(credentials.tenant_id.is_some()));
    info!("   Bot type: {}", credentials.app_type);
    info!("   Typing interval: {}ms", settings.typing_interval_ms);
    info!(
        "   Trusted service hosts: {}",
        settings.trusted_service_hosts.join(", ")
    );

    let http = reqwest::Client::new();

    let connector_tokens = credentials
        .connector_credentials(&settings.login_base_url)
        .map(|creds| Arc::new(TokenProvider::client_credentials(http.clone(), creds)));
    if connector_tokens.is_none() {
        warn!("No app credentials configured; replies are sent unauthenticated");
    }
    let connector = Arc::new(
        ConnectorClient::new(http.clone(), connector_tokens)
            .with_trusted_hosts(settings.trusted_service_hosts.clone()),
    );

    let graph_tokens = settings
        .graph_api_token
        .clone()
        .map(|token| Arc::new(TokenProvider::fixed(token)))
        .or_else(|| {
            credentials
                .graph_credentials(&settings.login_base_url)
                .map(|creds| Arc::new(TokenProvider::client_credentials(http.clone(), creds)))
        });
    info!("   Graph access: {}", check_mark(graph_tokens.is_some()));
    let directory = Arc::new(DirectoryClient::new(
        http,
        settings.graph_base_url.clone(),
        graph_tokens,
    ));

    let registry = ProcessingRegistry::new().with_typing_interval(settings.typing_interval());
    let guard =
        TurnGuard::new(registry.clone()).with_wait_message(settings.wait_message.clone());
    let handler = CommandHandler::new(guard, Arc::new(ConversationCounters::new()))
        .with_directory(directory);

    let state = AppState::new(Arc::new(handler), connector, &credentials);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Bot is listening on {}", addr);
    info!("Messaging endpoint: http://localhost:{}/api/messages", port);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Cleanup
    info!("Shutting down...");
    registry.cleanup();

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}

const fn check_mark(present: bool) -> &'static str {
    if present { "✓" } else { "✗" }
}
