//! Connection limit middleware for WebSocket connections
//!
//! This module provides middleware to enforce connection limits:
//! - Global maximum WebSocket connections
//! - Per-IP connection limits
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use chatbridge_gateway::middleware::connection_limit_middleware;
//!
//! let app = Router::new()
//!     .route("/api/realtime", get(realtime_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         connection_limit_middleware,
//!     ));
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::state::{AppState, ConnectionLimitError};

/// Extension type to carry the client IP through to the handler
/// so the handler can release the connection when done.
#[derive(Clone, Debug)]
pub struct ClientIp(pub IpAddr);

/// Middleware that enforces connection limits for WebSocket connections.
///
/// This middleware:
/// 1. Checks if the global WebSocket connection limit has been reached
/// 2. Checks if the per-IP connection limit has been reached
/// 3. Returns 503 Service Unavailable if global limit is exceeded
/// 4. Returns 429 Too Many Requests if per-IP limit is exceeded
/// 5. Injects `ClientIp` extension so handlers can release the connection later
/// 6. Releases the slot itself when the request is not switched to WebSocket
///
/// The middleware only applies to WebSocket upgrade requests (detected by the
/// Upgrade header). Non-WebSocket requests pass through without limit checks.
pub async fn connection_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    // Only apply limits to WebSocket upgrade requests
    let is_ws_upgrade = request
        .headers()
        .get("upgrade")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    if !is_ws_upgrade {
        // Not a WebSocket upgrade, pass through
        return next.run(request).await;
    }

    let client_ip = addr.ip();

    // Try to acquire a connection slot
    match state.try_acquire_connection(client_ip) {
        Ok(()) => {
            // Connection acquired, inject the client IP so handler can release it
            request.extensions_mut().insert(ClientIp(client_ip));
            // Once switched, the WebSocket handler owns the slot and releases it
            let response = next.run(request).await;
            if response.status() != StatusCode::SWITCHING_PROTOCOLS {
                tracing::debug!(
                    ip = %client_ip,
                    status = %response.status(),
                    "Upgrade not performed, releasing connection slot"
                );
                state.release_connection(client_ip);
            }
            response
        }
        Err(ConnectionLimitError::GlobalLimitReached) => {
            tracing::warn!(
                ip = %client_ip,
                "Rejecting connection: global limit reached"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server at capacity. Please try again later.",
            )
                .into_response()
        }
        Err(ConnectionLimitError::PerIpLimitReached) => {
            tracing::warn!(
                ip = %client_ip,
                "Rejecting connection: per-IP limit reached"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many connections from your IP address.",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::{Router, routing::get};
    use std::net::Ipv4Addr;
    use tower::ServiceExt;

    fn limited_config(global: Option<usize>, per_ip: u32) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.max_websocket_connections = global;
        config.max_connections_per_ip = per_ip;
        config
    }

    #[test]
    fn test_connection_limit_error_debug() {
        assert_eq!(
            format!("{:?}", ConnectionLimitError::GlobalLimitReached),
            "GlobalLimitReached"
        );
        assert_eq!(
            format!("{:?}", ConnectionLimitError::PerIpLimitReached),
            "PerIpLimitReached"
        );
    }

    #[tokio::test]
    async fn test_connection_tracking_basic() {
        let state = AppState::new(limited_config(Some(10), 3)).await;
        let ip: IpAddr = Ipv4Addr::new(192, 168, 1, 100).into();

        // Should start with 0 connections
        assert_eq!(state.ws_connection_count(), 0);
        assert_eq!(state.ip_connection_count(&ip), 0);

        for expected in 1..=3 {
            assert!(state.try_acquire_connection(ip).is_ok());
            assert_eq!(state.ws_connection_count(), expected);
            assert_eq!(state.ip_connection_count(&ip), expected as u32);
        }

        // Fourth connection should be rejected (per-IP limit)
        assert_eq!(
            state.try_acquire_connection(ip),
            Err(ConnectionLimitError::PerIpLimitReached)
        );
        assert_eq!(state.ws_connection_count(), 3);

        // Release one connection
        state.release_connection(ip);
        assert_eq!(state.ws_connection_count(), 2);
        assert_eq!(state.ip_connection_count(&ip), 2);

        // Should be able to acquire again
        assert!(state.try_acquire_connection(ip).is_ok());
        assert_eq!(state.ws_connection_count(), 3);
    }

    #[tokio::test]
    async fn test_global_connection_limit() {
        // Per-IP limit higher than global
        let state = AppState::new(limited_config(Some(5), 10)).await;

        let ips: Vec<IpAddr> = (1..=6)
            .map(|i| Ipv4Addr::new(192, 168, 1, i).into())
            .collect();

        for ip in &ips[0..5] {
            assert!(state.try_acquire_connection(*ip).is_ok());
        }
        assert_eq!(state.ws_connection_count(), 5);

        assert_eq!(
            state.try_acquire_connection(ips[5]),
            Err(ConnectionLimitError::GlobalLimitReached)
        );

        // Release one and try again
        state.release_connection(ips[0]);
        assert!(state.try_acquire_connection(ips[5]).is_ok());
    }

    fn limited_router(state: Arc<AppState>, status: StatusCode) -> Router {
        Router::new()
            .route("/api/realtime", get(move || async move { status }))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                connection_limit_middleware,
            ))
            .with_state(state)
    }

    fn upgrade_request(addr: SocketAddr) -> Request<Body> {
        let mut request = Request::builder()
            .uri("/api/realtime")
            .header("upgrade", "websocket")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[tokio::test]
    async fn test_middleware_rejects_over_limit_upgrades() {
        let state = AppState::new(limited_config(None, 1)).await;
        let addr: SocketAddr = "10.1.1.1:4000".parse().unwrap();

        let first = limited_router(state.clone(), StatusCode::SWITCHING_PROTOCOLS)
            .oneshot(upgrade_request(addr))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(state.ip_connection_count(&addr.ip()), 1);

        let second = limited_router(state.clone(), StatusCode::SWITCHING_PROTOCOLS)
            .oneshot(upgrade_request(addr))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_middleware_ignores_plain_requests() {
        let state = AppState::new(limited_config(Some(0), 0)).await;
        let mut request = Request::builder()
            .uri("/api/realtime")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("10.1.1.2:4000".parse::<SocketAddr>().unwrap()));

        let response = limited_router(state.clone(), StatusCode::OK)
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.ws_connection_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_upgrade_releases_slot() {
        let state = AppState::new(limited_config(Some(1), 1)).await;
        let addr: SocketAddr = "10.1.1.3:4000".parse().unwrap();

        for _ in 0..3 {
            let response = limited_router(state.clone(), StatusCode::BAD_REQUEST)
                .oneshot(upgrade_request(addr))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(state.ws_connection_count(), 0);
            assert_eq!(state.ip_connection_count(&addr.ip()), 0);
        }
    }
}
