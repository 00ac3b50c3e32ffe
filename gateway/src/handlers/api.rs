use axum::{Json, response::IntoResponse};
use serde_json::json;

/// Liveness check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"status":"OK"}"#);
    }
}
