//! Per-client request rate limiting
//!
//! Wraps `tower_governor` with a quota built from a requests-per-second rate.
//! Clients are keyed by `SmartIpKeyExtractor`: `x-forwarded-for`, `x-real-ip`
//! and `forwarded` first, then the peer address.

use std::time::Duration;

use axum::body::Body;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

use crate::config::ConfigError;

/// Rates at or above this disable the limiter (load testing).
pub const RATE_LIMIT_DISABLED_THRESHOLD: u32 = 100_000;

pub type RateLimitLayer = GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware, Body>;

/// Interval after which one request of the quota is replenished.
///
/// The governor builder takes this interval, not a rate.
pub fn replenish_period(requests_per_second: u32) -> Option<Duration> {
    (requests_per_second > 0).then(|| Duration::from_secs(1) / requests_per_second)
}

/// Build the rate limit layer, or `None` when limiting is disabled.
///
/// Each client may send `burst_size` requests at once and is then refilled
/// at `requests_per_second`.
pub fn rate_limit_layer(
    requests_per_second: u32,
    burst_size: u32,
) -> Result<Option<RateLimitLayer>, ConfigError> {
    if requests_per_second >= RATE_LIMIT_DISABLED_THRESHOLD {
        return Ok(None);
    }

    let period = replenish_period(requests_per_second).ok_or_else(|| {
        ConfigError::Invalid("RATE_LIMIT_REQUESTS_PER_SECOND must be greater than 0".to_string())
    })?;

    let config = GovernorConfigBuilder::default()
        .period(period)
        .burst_size(burst_size)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Invalid rate limit: {requests_per_second}/s with burst {burst_size}"
            ))
        })?;

    Ok(Some(GovernorLayer::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    fn limited_app(requests_per_second: u32, burst_size: u32) -> Router {
        let layer = rate_limit_layer(requests_per_second, burst_size)
            .unwrap()
            .unwrap();
        Router::new().route("/", get(|| async { "ok" })).layer(layer)
    }

    async fn status_for(app: &Router, client: &str) -> StatusCode {
        let request = Request::builder()
            .uri("/")
            .header("x-real-ip", client)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    #[test]
    fn test_replenish_period_is_inverse_of_rate() {
        assert_eq!(replenish_period(1), Some(Duration::from_secs(1)));
        assert_eq!(replenish_period(4), Some(Duration::from_millis(250)));
        assert_eq!(replenish_period(60), Some(Duration::from_nanos(16_666_666)));
        assert_eq!(replenish_period(0), None);
    }

    #[test]
    fn test_high_rate_disables_limiter() {
        assert!(
            rate_limit_layer(RATE_LIMIT_DISABLED_THRESHOLD, 10)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_invalid_quota_rejected() {
        assert!(rate_limit_layer(0, 10).is_err());
        assert!(rate_limit_layer(60, 0).is_err());
    }

    #[tokio::test]
    async fn test_burst_then_refill_at_configured_rate() {
        let app = limited_app(10, 5);

        for _ in 0..5 {
            assert_eq!(status_for(&app, "10.0.0.1").await, StatusCode::OK);
        }
        assert_eq!(
            status_for(&app, "10.0.0.1").await,
            StatusCode::TOO_MANY_REQUESTS
        );

        // One request is replenished every 100ms
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(status_for(&app, "10.0.0.1").await, StatusCode::OK);
        assert_eq!(status_for(&app, "10.0.0.1").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sustains_configured_rate() {
        let app = limited_app(20, 1);

        // Requests paced just under the rate are never rejected
        for _ in 0..10 {
            assert_eq!(status_for(&app, "10.0.0.2").await, StatusCode::OK);
            tokio::time::sleep(Duration::from_millis(60)).await;
        }
    }

    #[tokio::test]
    async fn test_clients_limited_independently() {
        let app = limited_app(1, 1);

        assert_eq!(status_for(&app, "10.0.0.3").await, StatusCode::OK);
        assert_eq!(
            status_for(&app, "10.0.0.3").await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status_for(&app, "10.0.0.4").await, StatusCode::OK);
    }
}
