//! Resource routes under /api/v1.
//!
//! Specialized resources (owned entities, calendar lookup, lifecycle
//! transitions, stubs) register static paths; everything else is served by
//! the generic handlers through the parameterized `/:resource` routes. The
//! router prefers static segments, so the generic routes never shadow the
//! specialized ones.

use crate::handlers::{anniversary, api_key, entity, stats, stub, subscription};
use crate::registry::STUB_RESOURCES;
use crate::state::AppState;
use axum::{
    routing::{any, get, post},
    Router,
};

pub fn entity_routes(state: AppState) -> Router {
    let mut router = Router::new()
        .route(
            "/daily-anniversaries/by-date",
            get(anniversary::by_date),
        )
        .route("/api-keys", get(api_key::list).post(api_key::create))
        .route(
            "/api-keys/:id",
            get(api_key::show)
                .patch(api_key::update)
                .put(api_key::update)
                .delete(api_key::destroy),
        )
        .route(
            "/user-subscriptions",
            get(subscription::list).post(subscription::create),
        )
        .route("/user-subscriptions/:id", get(subscription::show))
        .route("/user-subscriptions/:id/cancel", post(subscription::cancel))
        .route(
            "/user-subscriptions/:id/reactivate",
            post(subscription::reactivate),
        )
        .route("/:resource/statistics", get(stats::statistics))
        .route("/:resource", get(entity::list).post(entity::create))
        .route(
            "/:resource/:id",
            get(entity::show)
                .patch(entity::update)
                .put(entity::update)
                .delete(entity::destroy),
        );

    for resource in STUB_RESOURCES {
        router = router
            .route(&format!("/{}", resource), any(stub::under_development))
            .route(&format!("/{}/:id", resource), any(stub::under_development));
    }

    router.with_state(state)
}
