//! Route tables.

pub mod api;
pub mod realtime;

use std::sync::Arc;

use axum::{Router, middleware, routing::get};

use crate::handlers::api::health_check;
use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

/// All routes with state applied, without the outer CORS, rate limit and
/// security header layers added by the binary.
///
/// The realtime route sits behind the connection limit middleware, which
/// needs `ConnectInfo<SocketAddr>`; serve with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    let realtime_routes = realtime::create_realtime_router().layer(
        middleware::from_fn_with_state(state.clone(), connection_limit_middleware),
    );

    Router::new()
        .route("/", get(health_check))
        .merge(api::create_api_router())
        .merge(realtime_routes)
        .with_state(state)
}
