//! Server Startup Tests
//!
//! Tests for configuration loading and startup behavior: the gateway must boot
//! with nothing but defaults and serve its health check.

use std::io::Write;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serial_test::serial;
use tempfile::NamedTempFile;
use tower::util::ServiceExt;

use chatbridge_gateway::{ServerConfig, routes, state::AppState};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp config");
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Test that the server boots with default configuration (no credentials)
#[tokio::test]
async fn test_minimal_config_boot() {
    let app_state = AppState::new(ServerConfig::default()).await;
    assert!(app_state.direct_line.is_none());
    assert!(app_state.knowledge.is_none());

    let app = routes::create_app_router(app_state);
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"status": "OK"}));
}

/// Plain GETs on the realtime route are not upgrades and take no slot
#[tokio::test]
async fn test_realtime_route_requires_upgrade() {
    let app_state = AppState::new(ServerConfig::default()).await;
    let app = routes::create_app_router(app_state.clone())
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

    let request = Request::builder()
        .uri("/api/realtime")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(app_state.ws_connection_count(), 0);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = routes::create_app_router(AppState::new(ServerConfig::default()).await)
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
    let request = Request::builder()
        .uri("/api/unknown")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_boot_from_yaml_file() {
    let file = write_config(
        r#"
server:
  host: "127.0.0.1"
  port: 5050
realtime:
  endpoint: "https://voice.openai.azure.com"
  api_key: "rt-key"
  voice: "shimmer"
search:
  endpoint: "https://kb.search.windows.net"
  index: "faq"
  api_key: "kb-key"
direct_line:
  token: "dl-secret"
security:
  max_connections_per_ip: 4
"#,
    );

    let config = ServerConfig::from_file(&file.path().to_path_buf()).unwrap();
    assert_eq!(config.address(), "127.0.0.1:5050");
    assert_eq!(config.realtime.voice, "shimmer");
    assert_eq!(config.max_connections_per_ip, 4);
    assert!(!config.is_tls_enabled());

    let app_state = AppState::new(config).await;
    assert!(app_state.direct_line.is_some());
    assert!(app_state.knowledge.is_some());
}

#[test]
#[serial]
fn test_invalid_yaml_is_rejected() {
    let file = write_config("server: [unterminated");
    let err = ServerConfig::from_file(&file.path().to_path_buf()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse YAML config"));
}

#[test]
#[serial]
fn test_missing_config_file_is_rejected() {
    let path = std::path::PathBuf::from("/nonexistent/chatbridge.yaml");
    let err = ServerConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/chatbridge.yaml"));
}

#[test]
#[serial]
fn test_partial_search_credentials_are_rejected() {
    let file = write_config(
        r#"
search:
  endpoint: "https://kb.search.windows.net"
"#,
    );
    let err = ServerConfig::from_file(&file.path().to_path_buf()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("AZURE_SEARCH_INDEX"));
    assert!(message.contains("AZURE_SEARCH_API_KEY"));
}

#[test]
#[serial]
fn test_tls_without_paths_is_rejected() {
    let file = write_config(
        r#"
server:
  tls:
    enabled: true
"#,
    );
    assert!(ServerConfig::from_file(&file.path().to_path_buf()).is_err());
}

#[tokio::test]
async fn test_rate_limit_configurations() {
    let mut config = ServerConfig::default();
    config.rate_limit_requests_per_second = 100;
    config.rate_limit_burst_size = 50;
    let app_state = AppState::new(config).await;
    assert_eq!(app_state.config.rate_limit_requests_per_second, 100);
    assert_eq!(app_state.config.rate_limit_burst_size, 50);
}

/// Default limits (60/s, burst 10) over the full router: a client polling the
/// bot bridge at a steady pace must not be throttled.
#[tokio::test]
async fn test_default_rate_limit_sustains_polling() {
    let config = ServerConfig::default();
    let layer = chatbridge_gateway::middleware::rate_limit_layer(
        config.rate_limit_requests_per_second,
        config.rate_limit_burst_size,
    )
    .unwrap()
    .expect("rate limiting enabled by default");
    let app = routes::create_app_router(AppState::new(config).await).layer(layer);

    let health = || {
        Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap()
    };

    // Burst, then one over
    for _ in 0..10 {
        assert_eq!(app.clone().oneshot(health()).await.unwrap().status(), StatusCode::OK);
    }
    assert_eq!(
        app.clone().oneshot(health()).await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    // A short idle refills the quota
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(app.clone().oneshot(health()).await.unwrap().status(), StatusCode::OK);

    // Steady 40 requests/s stays under the limit
    for _ in 0..20 {
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        assert_eq!(app.clone().oneshot(health()).await.unwrap().status(), StatusCode::OK);
    }
}
