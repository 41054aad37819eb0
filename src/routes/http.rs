//! Plain HTTP endpoints. Page interaction goes through the WebSocket.

use axum::{response::IntoResponse, Json};
use tracing::instrument;

use crate::protocol::HealthOut;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }
