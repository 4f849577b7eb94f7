//! The under-development resources must answer 501 on every method rather
//! than pretending to have a contract.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, get, request};
use serde_json::json;

const STUBS: &[&str] = &[
    "book-reviews",
    "festival-schedules",
    "social-entities",
    "trending-topics",
    "notification-settings",
];

#[tokio::test]
async fn listing_a_stub_resource_is_501() {
    for resource in STUBS {
        let app = common::build_test_app();
        let response = get(app, &format!("/api/v1/{}", resource)).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED, "{}", resource);
        let json = body_json(response).await;
        assert_eq!(json["message"], "This endpoint is under development.");
    }
}

#[tokio::test]
async fn mutating_a_stub_resource_is_501() {
    let app = common::build_test_app();
    let response = request(
        app,
        Method::POST,
        "/api/v1/book-reviews",
        None,
        Some(json!({"rating": 5})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

    let app = common::build_test_app();
    let response = request(app, Method::DELETE, "/api/v1/trending-topics/9", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}
