//! Chat gateway client binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                GATEWAY CLIENT                 │
//!                       │                                               │
//!   Event gateway       │  ┌────────┐   ┌──────────────┐   ┌─────────┐ │
//!   ───── WS frames ────┼─▶│ reader │──▶│inbound queue │──▶│ process │ │
//!                       │  └────────┘   └──────────────┘   │ workers │ │
//!                       │                                   └────┬────┘ │
//!                       │              ┌───────────────┐         │      │
//!                       │              │  correlation  │◀── API ─┤      │
//!                       │              │     table     │  resp.  │      │
//!                       │              └───────────────┘         ▼      │
//!                       │                                   ┌─────────┐ │
//!                       │   ┌──────────────────────────────▶│ router  │ │
//!                       │   │ registrations (startup)       └────┬────┘ │
//!                       │   │                                    ▼      │
//!                       │   │                              ┌──────────┐ │
//!                       │   │          handlers run on ──▶ │ handler  │ │
//!                       │   │                              │   pool   │ │
//!                       │   │                              └────┬─────┘ │
//!                       │   │  ┌────────┐   ┌───────────────┐   │       │
//!   ◀──── WS frames ────┼───┼──│ writer │◀──│outbound queue │◀──┘       │
//!                       │   │  │ workers│   └───────────────┘           │
//!                       │   │  └────────┘                               │
//!                       └───┴───────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_gateway::config::{load_config, GatewayConfig};
use chat_gateway::permission::ConfigResolver;
use chat_gateway::routing::{handler, Router};
use chat_gateway::{message, PermissionLevel, RegistryError, Session};

#[derive(Parser)]
#[command(name = "chat-gateway")]
#[command(about = "Gateway client for a chat platform", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        process_workers = config.pipeline.process_workers,
        writer_workers = config.pipeline.writer_workers,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => chat_gateway::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let router = Arc::new(build_router(&config)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "waiting for the event gateway");

    // The transport is accept-once: exactly one gateway connection per run.
    let (stream, peer) = listener.accept().await?;
    tracing::info!(peer = %peer, "gateway connected");
    let ws = tokio_tungstenite::accept_async(stream).await?;

    let mut session = Session::start(ws, router, &config);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
        _ = session.closed() => tracing::info!("gateway connection ended"),
    }
    session.shutdown().await;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Assemble the routing tables. Registrations happen here, before the
/// session starts; a duplicate key aborts startup.
fn build_router(config: &GatewayConfig) -> Result<Router, RegistryError> {
    let resolver = ConfigResolver::new(
        config.permission.superusers.clone(),
        config.permission.whitelist.clone(),
        config.permission.blacklist.clone(),
    );
    let mut builder = Router::builder(Box::new(resolver));

    // Built-in echo command: replies with the plain text after the command.
    builder.on_prefix(
        &["/echo"],
        handler(|event, api| async move {
            let reply = {
                let text = event.message().unwrap_or("");
                let args: String = text.chars().skip(event.command_len.max(0) as usize).collect();
                message::plain_text(args.trim())
            };
            if !reply.is_empty() {
                let _ = api.send_msg(&event, &reply).await;
            }
        }),
        PermissionLevel::Normal,
        false,
    )?;

    Ok(builder.build())
}
