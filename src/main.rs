use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tweet_mirror::config::Config;
use tweet_mirror::sync::{run_cycle, Cycle, MirrorContext};
use tweet_mirror::web;

#[derive(Debug, Parser)]
#[command(version, about = "Mirror a Twitter account to Mastodon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP trigger endpoint.
    Serve,
    /// Run one post mirroring cycle and exit.
    PostSync,
    /// Run one profile mirroring cycle and exit.
    ProfileSync,
    /// Run the cycle configured for a schedule identity and exit.
    Trigger {
        /// Schedule identity, e.g. "*/5 * * * *".
        schedule: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    init_tracing()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        user_id = %config.twitter_user_id,
        mastodon = %config.mastodon_base_url(),
        "Configuration loaded"
    );

    let ctx = MirrorContext::from_config(&config)
        .await
        .context("Failed to initialize clients")?;

    let cycle = match cli.command {
        Command::Serve => return web::serve(config, ctx, shutdown_signal()).await,
        Command::PostSync => Cycle::PostSync,
        Command::ProfileSync => Cycle::ProfileSync,
        Command::Trigger { schedule } => Cycle::from_schedule(&schedule, &config)
            .with_context(|| format!("No cycle is scheduled as '{schedule}'"))?,
    };

    let report = run_cycle(&ctx, cycle).await?;
    info!(report = ?report, "Done");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tweet_mirror=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down");
}
