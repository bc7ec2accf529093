// GET/POST handlers: version, progress, refresh

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use super::AppState;
use crate::version::{NAME, VERSION};

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/progress — latest view: summary, state, countdown.
pub(super) async fn progress_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.poller.current())
}

/// POST /api/refresh — fetch now. 202 when accepted, 503 when the poller has shut down.
pub(super) async fn refresh_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.poller.refresh_now() {
        (StatusCode::ACCEPTED, axum::Json(serde_json::json!({ "refresh": "queued" })))
    } else {
        tracing::warn!(operation = "refresh_now", "refresh requested but poller is gone");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(serde_json::json!({ "refresh": "unavailable" })),
        )
    }
}
