use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::conversations;
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/conversations/start",
            post(conversations::start_conversation),
        )
        .route(
            "/api/conversations/{id}/messages",
            post(conversations::send_message)
                .get(conversations::get_messages)
                .delete(conversations::clear_messages),
        )
        .route(
            "/api/conversations/{id}/activities",
            get(conversations::get_activities),
        )
        .layer(TraceLayer::new_for_http())
}
