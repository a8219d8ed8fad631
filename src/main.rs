//! Aral · Tagalog Practice Backend
//!
//! - Axum HTTP + WebSocket API
//! - Weighted-recency quiz sampling over per-item practice weights
//! - Staged answer verification with optional embedding-service similarity
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   ARAL_CONFIG_PATH      : path to TOML config (tuning knobs + content bank)
//!   ARAL_DATA_DIR       : persistence directory (default "./data")
//!   EMBEDDING_BASE_URL    : enables semantic answer judging if present
//!   EMBEDDING_VOCAB_PATH  : optional token->id vocab JSON for the encoder
//!   LOG_LEVEL     : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod normalize;
mod embedding;
mod policy;
mod sampler;
mod question;
mod verify;
mod store;
mod state;
mod protocol;
mod logic;
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

  // Build shared application state (item stores, profile, embedding client).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "aral_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
