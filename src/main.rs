//! Celebrity Trivia · Game Session & Scoring Backend
//!
//! - Axum HTTP API under /api/v1
//! - In-memory stores behind repository traits
//! - Built-in content bank when no config file is given
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   TRIVIA_CONFIG_PATH  : path to TOML config (game settings, users, content bank)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default), "compact" or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod store;
mod seeds;
mod identity;
mod evaluator;
mod aggregator;
mod selector;
mod daily;
mod leaderboard;
mod session;
mod stats;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Config, stores and engine components.
  let state = Arc::new(AppState::from_env().await);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "trivia_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "trivia_backend", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!(target: "trivia_backend", "Ctrl-C received; shutting down"),
    Err(e) => warn!(target: "trivia_backend", error = %e, "Failed to listen for Ctrl-C; shutting down"),
  }
}
