//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, TestApp};

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = TestApp::without_worker().await;
    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["worker"], "external");
    assert_eq!(json["queue"]["waiting"], 0);
}

#[tokio::test]
async fn health_check_reports_queue_depth() {
    let app = TestApp::without_worker().await;
    for description in ["oak stool", "linen apron"] {
        let response = app
            .post_json("/api/v1/jobs", serde_json::json!({ "description": description }))
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    let json = body_json(app.get("/health").await).await;

    assert_eq!(json["queue"]["waiting"], 2);
    assert_eq!(json["queue"]["active"], 0);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = TestApp::without_worker().await;
    let response = app.get("/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = TestApp::without_worker().await;
    let response = app.get("/health").await;

    let id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header")
        .to_str()
        .unwrap();
    assert_eq!(id.len(), 36, "x-request-id should be a UUID string");
}

#[tokio::test]
async fn cors_preflight_returns_correct_headers() {
    let app = TestApp::without_worker().await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/generate")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers
            .get("access-control-allow-origin")
            .expect("Missing Access-Control-Allow-Origin header"),
        "http://localhost:5173"
    );
    let allow_methods = headers
        .get("access-control-allow-methods")
        .expect("Missing Access-Control-Allow-Methods header")
        .to_str()
        .unwrap();
    assert!(allow_methods.contains("POST"), "got: {allow_methods}");
}
