//! Serve command - run the REST API.

use clap::Args;
use console::style;
use tracing::{info, warn};

use lensa_server::{router, AppState};

use super::load_config;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let addr = format!(
        "{}:{}",
        args.host.unwrap_or_else(|| config.server.host.clone()),
        args.port.unwrap_or(config.server.port)
    );

    println!("{} Loading services...", style("ℹ").blue());
    let state = tokio::task::spawn_blocking(move || AppState::from_config(&config)).await?;

    for (name, loaded) in [
        ("NSFW detection", state.nsfw.is_some()),
        ("Image to text", state.caption.is_some()),
        ("ID card processing", state.id_card.is_some()),
    ] {
        if loaded {
            println!("  {} {}", style("✓").green(), name);
        } else {
            println!("  {} {} (unavailable)", style("✗").red(), name);
        }
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);
    println!("{} Listening on http://{}", style("✓").green(), addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
