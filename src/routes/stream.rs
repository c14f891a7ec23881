//! Media stream WebSocket route configuration

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream_handler;
use crate::middleware::connection_limit_middleware;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream router
///
/// # Endpoint
///
/// `GET /stream` - WebSocket upgrade for a Twilio `<Connect><Stream>` call.
/// An optional `?persona=<id>` query parameter picks the persona when the
/// TwiML does not pass a `persona` custom parameter.
///
/// # Protocol
///
/// Twilio sends `connected`, `start`, a `media` frame every 20 ms and a
/// final `stop`. The gateway answers with `media` frames carrying
/// synthesized µ-law audio and `clear` when the caller barges in.
///
/// Requests are subject to the global and per-IP connection limits.
pub fn create_stream_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/stream", get(media_stream_handler))
        .layer(middleware::from_fn_with_state(
            state,
            connection_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}
