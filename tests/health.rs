//! Integration tests for the common routes and general HTTP behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, get};

#[tokio::test]
async fn health_answers_ok() {
    let app = common::build_test_app();
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn version_reports_the_package() {
    let app = common::build_test_app();
    let response = get(app, "/version").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "acervo-api");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn unknown_top_level_route_is_404() {
    let app = common::build_test_app();
    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_resource_is_404_with_message() {
    let app = common::build_test_app();
    let response = get(app, "/api/v1/no-such-resource").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Resource not found.");
}
