//! Integration tests for the Axum web server.
//!
//! These tests verify that routes are correctly wired to handlers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use transcribe_axum::bootstrap::{bootstrap, AxumContext, CorsConfig, ServerConfig};
use transcribe_axum::routes::create_router;
use transcribe_core::settings::Settings;

/// Build a `ServerConfig` pointed at a throwaway SQLite file under a
/// fresh temp dir, so each test gets an isolated store.
fn test_config(dir: &tempfile::TempDir) -> ServerConfig {
    let mut settings = Settings::default();
    settings.store_url = format!("sqlite://{}", dir.path().join("test.db").display());
    ServerConfig {
        port: 0,
        settings,
        static_dir: None,
        cors: CorsConfig::AllowAll,
    }
}

async fn boot() -> (tempfile::TempDir, AxumContext) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = bootstrap(&test_config(&dir)).await.expect("bootstrap should succeed");
    (dir, ctx)
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn jobs_endpoint_returns_empty_json_array_on_fresh_store() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(Request::builder().uri("/api/jobs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"[]");
}

#[tokio::test]
async fn models_endpoint_returns_json_array() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(Request::builder().uri("/api/models").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body_str = std::str::from_utf8(&body).unwrap();
    assert!(
        body_str.starts_with('[') && body_str.ends_with(']'),
        "expected a JSON array, got: {body_str}"
    );
}

#[tokio::test]
async fn queue_endpoint_returns_snapshot_fields() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(Request::builder().uri("/api/queue").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body_str = std::str::from_utf8(&body).unwrap();
    assert!(body_str.contains("admission_limit"));
    assert!(body_str.contains("in_flight"));
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_text() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(Request::builder().uri("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body_str = std::str::from_utf8(&body).unwrap();
    assert!(body_str.contains('#'), "expected Prometheus comment lines, got: {body_str}");
}

#[tokio::test]
async fn events_endpoint_returns_sse_stream() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(Request::builder().uri("/api/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap_or("").starts_with("text/event-stream"))
        .unwrap_or(false));
}

/// Regression guard: the SSE endpoint must not be swallowed by the SPA
/// fallback when both are mounted on the same router.
#[tokio::test]
async fn events_endpoint_not_intercepted_by_spa_fallback() {
    use std::io::Write;
    use tempfile::TempDir;
    use transcribe_axum::routes::create_spa_router;

    let (_dir, ctx) = boot().await;

    let static_dir = TempDir::new().unwrap();
    let index_path = static_dir.path().join("index.html");
    let mut file = std::fs::File::create(&index_path).unwrap();
    write!(file, "<!DOCTYPE html><html><body>app</body></html>").unwrap();

    let app = create_spa_router(ctx, static_dir.path(), &CorsConfig::AllowAll);

    let response = app
        .oneshot(Request::builder().uri("/api/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap_or(""))
        .unwrap_or("");
    assert!(
        content_type.starts_with("text/event-stream"),
        "SSE endpoint should return text/event-stream, not HTML. Got: {content_type}"
    );
}

#[tokio::test]
async fn spa_fallback_serves_index_html_for_unknown_client_routes() {
    use std::io::Write;
    use tempfile::TempDir;
    use transcribe_axum::routes::create_spa_router;

    let (_dir, ctx) = boot().await;

    let static_dir = TempDir::new().unwrap();
    let index_path = static_dir.path().join("index.html");
    let mut file = std::fs::File::create(&index_path).unwrap();
    write!(file, "<!DOCTYPE html><html><body>app-shell</body></html>").unwrap();

    let app = create_spa_router(ctx, static_dir.path(), &CorsConfig::AllowAll);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/jobs/some-client-route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap_or("").contains("text/html"))
        .unwrap_or(false));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body_str = std::str::from_utf8(&body).unwrap();
    assert!(body_str.contains("app-shell"));
}

#[tokio::test]
async fn nonexistent_api_route_returns_not_found() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn job_get_by_id_returns_not_found_for_unknown_id() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/jobs/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn queue_reorder_accepts_post_json_body() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/queue/reorder")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"job_ids":[]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(
        response.status(),
        StatusCode::METHOD_NOT_ALLOWED,
        "POST should be allowed on /api/queue/reorder"
    );
    assert_ne!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn model_register_accepts_post_and_returns_model() {
    let (_dir, ctx) = boot().await;
    let app = create_router(ctx, &CorsConfig::AllowAll);

    let request_body = r#"{
        "name": "whisper-base",
        "model_type": "stt",
        "engine": "whisper-cpp",
        "upstream_id": "ggerganov/whisper.cpp"
    }"#;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/models")
                .header("content-type", "application/json")
                .body(Body::from(request_body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body_str = std::str::from_utf8(&body).unwrap();
    assert!(body_str.contains("whisper-base"));
}
