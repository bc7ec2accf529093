// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::poller::PollerClient;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) poller: PollerClient,
    pub(crate) config: AppConfig,
}

pub fn app(poller: PollerClient, config: AppConfig) -> Router {
    let state = AppState { poller, config };
    Router::new()
        .route("/", get(|| async { "runprogress: watching run status" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/progress", get(http::progress_handler)) // GET /api/progress
        .route("/api/refresh", post(http::refresh_handler)) // POST /api/refresh
        .route("/ws/progress", get(ws::ws_progress)) // WS /ws/progress
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
