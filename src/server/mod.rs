//! Server composition: router, shared state, and background tasks.

pub mod hub;
pub mod ws;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use hub::{handle_disconnect, handle_intent, spawn_sweeper, AppState, Hub};

/// Build the HTTP surface: the WebSocket endpoint, a health probe, and
/// the bundled client assets.
pub fn build_router(state: AppState) -> Router {
    let cors = match state.config.server.cors_origin.as_str() {
        "*" => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        origin => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .expect("invalid cors_origin in config"),
            )
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
    };

    let static_dir = state.config.server.static_dir.clone();
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(|| async { "ok" }))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
