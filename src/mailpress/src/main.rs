//! MailPress — campaign email dispatch engine.
//!
//! Main entry point that wires the store, transport, and dispatcher, then
//! starts the HTTP server.

use clap::Parser;
use mailpress_api::ApiServer;
use mailpress_core::config::AppConfig;
use mailpress_delivery::sendgrid::{SendGridConfig, SendGridTransport};
use mailpress_delivery::tracking::PixelTracker;
use mailpress_delivery::transport::{EmailTransport, MemoryTransport};
use mailpress_engine::Dispatcher;
use mailpress_store::{CampaignStore, MemoryStore, SettingsStore};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mailpress")]
#[command(about = "Campaign email dispatch engine")]
#[command(version)]
struct Cli {
    /// HTTP port (overrides config)
    #[arg(long, env = "MAILPRESS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Public base URL for tracking and unsubscribe links (overrides config)
    #[arg(long, env = "MAILPRESS__DISPATCH__PUBLIC_BASE_URL")]
    base_url: Option<String>,

    /// Maximum concurrent per-recipient sends (overrides config)
    #[arg(long, env = "MAILPRESS__DISPATCH__MAX_CONCURRENT_SENDS")]
    max_concurrent_sends: Option<usize>,

    /// SendGrid API key; without it the in-memory transport is used
    #[arg(long, env = "MAILPRESS__SENDGRID__API_KEY")]
    sendgrid_api_key: Option<String>,

    /// Skip seeding the demo campaign
    #[arg(long, default_value_t = false)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpress=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("MailPress starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(base_url) = cli.base_url {
        config.dispatch.public_base_url = base_url;
    }
    if let Some(limit) = cli.max_concurrent_sends {
        config.dispatch.max_concurrent_sends = limit;
    }

    info!(
        http_port = config.api.http_port,
        base_url = %config.dispatch.public_base_url,
        max_concurrent_sends = config.dispatch.max_concurrent_sends,
        "Configuration loaded"
    );

    // Initialize store
    let store = Arc::new(MemoryStore::new());
    if !cli.no_seed {
        store.seed_demo_data();
    }

    // Initialize transport
    let transport: Arc<dyn EmailTransport> = match cli.sendgrid_api_key {
        Some(api_key) => Arc::new(SendGridTransport::new(SendGridConfig {
            api_key,
            endpoint: "https://api.sendgrid.com/v3/mail/send".to_string(),
        })),
        None => {
            info!("No SendGrid API key configured, using in-memory transport");
            Arc::new(MemoryTransport::new())
        }
    };

    // Initialize dispatcher
    let dispatcher = Arc::new(
        Dispatcher::new(
            Arc::clone(&store) as Arc<dyn CampaignStore>,
            Arc::clone(&store) as Arc<dyn SettingsStore>,
            transport,
            Arc::new(PixelTracker),
        )
        .with_max_concurrent_sends(config.dispatch.max_concurrent_sends),
    );

    // Start API server
    let api_server = ApiServer::new(config, store, dispatcher);

    if let Err(e) = api_server.start_metrics().await {
        tracing::error!(error = %e, "Failed to start metrics exporter");
    }

    info!("MailPress is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
