//! Realtime WebSocket route configuration
//!
//! This module configures the WebSocket endpoint of the realtime voice relay.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::realtime::realtime_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the Realtime WebSocket router
///
/// # Endpoint
///
/// `GET /api/realtime` - WebSocket upgrade, relayed to Azure OpenAI Realtime
///
/// # Example
///
/// ```json
/// // Client sends upstream events unchanged
/// {"type": "input_audio_buffer.append", "audio": "<base64 pcm16>"}
///
/// // Server forwards selected upstream events
/// {"type": "response.audio_transcript.delta", "delta": "Our opening hours"}
/// ```
pub fn create_realtime_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/realtime", get(realtime_handler))
        .layer(TraceLayer::new_for_http())
}
