use std::sync::Arc;

use acervo_api::{app_router, AppState, CatalogModel};
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

/// Build the full application router with the same middleware stack as
/// `main.rs`. The pool connects lazily, so tests that never touch the
/// database run without one.
pub fn build_test_app() -> Router {
    let url = std::env::var("TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/acervo_test".into());
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_lazy(&url)
        .expect("pool options must be valid");
    let state = AppState {
        pool,
        model: Arc::new(CatalogModel::builtin().expect("builtin catalog must validate")),
    };
    app_router(state, 1024 * 1024)
}

pub async fn request(
    app: Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    request(app, Method::GET, uri, None, None).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
