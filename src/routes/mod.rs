//! Router assembly: WebSocket upgrade, health check, the page shell, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one page session per connection)
/// - health check at `/api/v1/health`
/// - the page shell from `static_dir` with index fallback
/// - CORS (allow any origin/method/headers) and per-request trace spans
pub fn build_router(state: Arc<AppState>) -> Router {
    let index = format!("{}/index.html", state.static_dir.trim_end_matches('/'));
    let static_service = ServeDir::new(&state.static_dir)
        .append_index_html_on_directories(true)
        // 200 with the shell for page routes such as /feedback
        .fallback(ServeFile::new(index));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;
    use tokio::net::TcpListener;

    use crate::config::UxConfig;
    use crate::upstream::{RenderMode, Upstream};

    async fn spawn_app() -> std::net::SocketAddr {
        let upstream = Upstream::new("http://127.0.0.1:9", RenderMode::Direct, Duration::from_secs(1)).unwrap();
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/static");
        let state = Arc::new(AppState::new(UxConfig::default(), upstream, static_dir.into()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn health_endpoint_answers_ok() {
        let addr = spawn_app().await;
        let body: serde_json::Value = reqwest::get(format!("http://{addr}/api/v1/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({ "ok": true }));
    }

    #[tokio::test]
    async fn page_shell_is_served_for_root_and_feedback_paths() {
        let addr = spawn_app().await;
        for path in ["/", "/feedback?task_flappy_bird=true"] {
            let res = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
            assert!(res.status().is_success(), "{path}");
            let body = res.text().await.unwrap();
            assert!(body.contains(r#"id="items-container""#), "{path}");
            assert!(body.contains("/ws"), "{path}");
        }
    }
}
