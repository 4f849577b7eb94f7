//! Ownership-scoped resources require a principal; everything else is open.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, request};
use serde_json::json;

#[tokio::test]
async fn api_keys_require_a_principal() {
    let app = common::build_test_app();
    let response = request(app, Method::GET, "/api/v1/api-keys", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Unauthenticated.");
}

#[tokio::test]
async fn malformed_bearer_values_are_rejected() {
    for token in ["", "abc", "-4", "0"] {
        let app = common::build_test_app();
        let response = request(app, Method::GET, "/api/v1/api-keys", Some(token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "token {:?}", token);
    }
}

#[tokio::test]
async fn subscriptions_require_a_principal_before_any_validation() {
    let app = common::build_test_app();
    let response = request(
        app,
        Method::POST,
        "/api/v1/user-subscriptions",
        None,
        Some(json!({"plan_id": 1})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = common::build_test_app();
    let response = request(
        app,
        Method::POST,
        "/api/v1/user-subscriptions/3/cancel",
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
