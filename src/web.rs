//! HTTP trigger surface.
//!
//! `POST /scheduled` runs the cycle whose schedule identity matches the
//! request. `GET /` answers with an empty 200 and touches nothing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::sync::{run_cycle, Cycle, MirrorContext};

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ctx: MirrorContext,
}

/// Body of a scheduled trigger firing.
#[derive(Debug, Deserialize)]
pub struct ScheduledEvent {
    /// Schedule identity, e.g. the cron expression that fired.
    pub cron: String,
}

/// Build the router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/scheduled", post(scheduled))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn scheduled(State(state): State<AppState>, Json(event): Json<ScheduledEvent>) -> Response {
    let Some(cycle) = Cycle::from_schedule(&event.cron, &state.config) else {
        warn!(cron = %event.cron, "Trigger for unknown schedule");
        return (
            StatusCode::NOT_FOUND,
            format!("no cycle scheduled as '{}'", event.cron),
        )
            .into_response();
    };

    match run_cycle(&state.ctx, cycle).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(cycle = ?cycle, "Cycle failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve the trigger surface until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener fails.
pub async fn serve(
    config: Config,
    ctx: MirrorContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(AppState {
        config: Arc::new(config),
        ctx,
    });

    info!(addr = %addr, "Starting trigger server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Web server error")?;

    Ok(())
}
