//! Game search usability lab · page service
//!
//! - Axum WebSocket API driving the search page (one session per open page)
//! - Search, render and feedback calls forwarded to the upstream search site
//! - Static page shell fallback (STATIC_DIR/index.html). The shipped
//!   `static/index.html` carries the DOM ids the patches address and a small
//!   script that forwards page events and applies patches; a styled shell can
//!   replace it as long as it keeps both.
//!
//! Important env variables:
//!   PORT                  : u16 (default 8080)
//!   UPSTREAM_BASE_URL     : search site serving /query, /render/documents, /feedback
//!                           (default "http://127.0.0.1:3000")
//!   RENDER_MODE           : "documents" (default, JSON then render) or "direct" (HTML)
//!   UPSTREAM_TIMEOUT_SECS : per-request timeout (default 20)
//!   STATIC_DIR            : page shell directory (default "./static")
//!   UX_CONFIG_PATH        : path to TOML config (hint texts + messages)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod state;
mod protocol;
mod challenge;
mod highlight;
mod tags;
mod feedback;
mod upstream;
mod session;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: page texts, upstream client, static dir.
  let state = Arc::new(AppState::from_env()?);

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "gamesearch_ux", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "gamesearch_ux", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "gamesearch_ux", "Shutdown requested");
}
