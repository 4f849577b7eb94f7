//! User subscription handlers: owner-scoped reads plus the lifecycle
//! transitions (create, cancel, reactivate).

use super::entity::{body_to_map, parse_id, parse_list_params};
use crate::error::{AppError, ValidationErrors};
use crate::extractors::Principal;
use crate::registry::EntityDef;
use crate::response::{Page, PageMeta, Resource};
use crate::service::subscription::{
    blocks_duplicate, can_cancel, can_reactivate, cancellation_end, has_lapsed, initial_status,
    period_end, trial_end, SubscriptionStatus, STATUS_EXPIRED,
};
use crate::service::{CatalogService, RequestValidator};
use crate::sql::{Direction, ListSelect, RecordKey};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

fn subscriptions(state: &AppState) -> Result<&EntityDef, AppError> {
    state
        .model
        .entity("user-subscriptions")
        .ok_or(AppError::NotFound)
}

fn parse_status(row: &Value) -> Result<SubscriptionStatus, AppError> {
    row.get("status")
        .and_then(Value::as_str)
        .and_then(SubscriptionStatus::parse)
        .ok_or(AppError::BadRequest("Subscription row has an invalid status.".into()))
}

fn timestamp_field(row: &Value, field: &str) -> Option<DateTime<Utc>> {
    row.get(field)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// A trial or cancellation whose end has passed reads as `expired`. The
/// stored row is untouched; no scheduler runs the transition.
fn lapsed(row: &Value, now: DateTime<Utc>) -> bool {
    parse_status(row)
        .map(|status| {
            has_lapsed(
                status,
                now,
                timestamp_field(row, "trial_ends_at"),
                timestamp_field(row, "ends_at"),
            )
        })
        .unwrap_or(false)
}

fn apply_expiry(row: &mut Value, now: DateTime<Utc>) {
    if lapsed(row, now) {
        row["status"] = Value::String(STATUS_EXPIRED.to_string());
    }
}

pub async fn list(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Value>>, AppError> {
    let entity = subscriptions(&state)?;
    let lp = parse_list_params(entity, &params, Some(principal.user_id))?;
    let (mut rows, total) =
        CatalogService::page(&state.pool, &state.model, entity, &lp.select).await?;
    let now = Utc::now();
    for row in &mut rows {
        apply_expiry(row, now);
    }
    Ok(Json(Page {
        data: rows,
        meta: PageMeta::new(lp.page, lp.per_page, total),
    }))
}

pub async fn show(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Resource<Value>>, AppError> {
    let entity = subscriptions(&state)?;
    let id = parse_id(&id)?;
    let mut row = CatalogService::find(
        &state.pool,
        &state.model,
        entity,
        &RecordKey::Id(id),
        Some(principal.user_id),
    )
    .await?
    .ok_or(AppError::NotFound)?;
    apply_expiry(&mut row, Utc::now());
    Ok(Json(Resource { data: row }))
}

/// POST /user-subscriptions
///
/// Creates a subscription to an active plan. A trial/active subscription to
/// the same plan blocks a second one; the check is an application-level read
/// before the insert, not an atomic guard.
pub async fn create(
    principal: Principal,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Resource<Value>>), AppError> {
    let entity = subscriptions(&state)?;
    let plans = state
        .model
        .entity("subscription-plans")
        .ok_or(AppError::NotFound)?;
    let body = body_to_map(body)?;
    RequestValidator::validate_create(entity, &body).into_result()?;
    let plan_id = body
        .get("plan_id")
        .and_then(Value::as_i64)
        .ok_or(AppError::BadRequest("plan_id must be an integer.".into()))?;

    let plan = CatalogService::find(
        &state.pool,
        &state.model,
        plans,
        &RecordKey::Id(plan_id),
        None,
    )
    .await?;
    let Some(plan) = plan.filter(|p| p["active"].as_bool().unwrap_or(false)) else {
        return Err(AppError::Validation(ValidationErrors::single(
            "plan_id",
            "The selected plan_id is invalid.",
        )));
    };

    let existing = CatalogService::page(
        &state.pool,
        &state.model,
        entity,
        &ListSelect {
            filters: vec![crate::sql::Filter {
                column: "plan_id".to_string(),
                value: Value::Number(plan_id.into()),
                kind: crate::registry::FilterKind::Equals,
            }],
            search: None,
            sort: "id".to_string(),
            direction: Direction::Asc,
            limit: 100,
            offset: 0,
            owner: Some(principal.user_id),
        },
    )
    .await?
    .0;
    let now = Utc::now();
    let duplicate = existing.iter().any(|row| {
        !lapsed(row, now) && parse_status(row).map(blocks_duplicate).unwrap_or(false)
    });
    if duplicate {
        return Err(AppError::Validation(ValidationErrors::single(
            "plan_id",
            "The user is already subscribed to this plan.",
        )));
    }

    let trial_days = plan["trial_days"].as_i64().unwrap_or(0);
    let period = plan["period"].as_str().unwrap_or("monthly");
    let status = initial_status(trial_days);
    let trial_ends = trial_end(now, trial_days)
        .map(|t| Value::String(t.to_rfc3339()))
        .unwrap_or(Value::Null);
    let extra = [
        ("user_id", Value::Number(principal.user_id.into())),
        ("status", Value::String(status.as_str().to_string())),
        ("trial_ends_at", trial_ends),
        (
            "current_period_end",
            Value::String(period_end(now, period).to_rfc3339()),
        ),
    ];
    let row = CatalogService::create(&state.pool, entity, &body, &extra).await?;
    Ok((StatusCode::CREATED, Json(Resource { data: row })))
}

/// POST /user-subscriptions/{id}/cancel
///
/// Only an active subscription is cancellable. Immediate by default;
/// `{"at_period_end": true}` defers the end to the current billing period.
pub async fn cancel(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Resource<Value>>, AppError> {
    let entity = subscriptions(&state)?;
    let id = parse_id(&id)?;
    let row = CatalogService::find(
        &state.pool,
        &state.model,
        entity,
        &RecordKey::Id(id),
        Some(principal.user_id),
    )
    .await?
    .ok_or(AppError::NotFound)?;

    let status = parse_status(&row)?;
    if !can_cancel(status) {
        return Err(AppError::Validation(ValidationErrors::single(
            "status",
            "Only an active subscription can be cancelled.",
        )));
    }

    let at_period_end = body
        .as_ref()
        .and_then(|j| j.0.get("at_period_end"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let now = Utc::now();
    let ends_at = cancellation_end(now, at_period_end, timestamp_field(&row, "current_period_end"));
    let sets = [
        (
            "status",
            Value::String(SubscriptionStatus::Cancelled.as_str().to_string()),
        ),
        ("cancelled_at", Value::String(now.to_rfc3339())),
        ("ends_at", Value::String(ends_at.to_rfc3339())),
    ];
    let row = CatalogService::update_columns(
        &state.pool,
        entity,
        id,
        &sets,
        Some(principal.user_id),
    )
    .await?
    .ok_or(AppError::NotFound)?;
    Ok(Json(Resource { data: row }))
}

/// POST /user-subscriptions/{id}/reactivate
///
/// Only a cancelled subscription can be reactivated.
pub async fn reactivate(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Resource<Value>>, AppError> {
    let entity = subscriptions(&state)?;
    let id = parse_id(&id)?;
    let row = CatalogService::find(
        &state.pool,
        &state.model,
        entity,
        &RecordKey::Id(id),
        Some(principal.user_id),
    )
    .await?
    .ok_or(AppError::NotFound)?;

    let status = parse_status(&row)?;
    if !can_reactivate(status) || lapsed(&row, Utc::now()) {
        return Err(AppError::Validation(ValidationErrors::single(
            "status",
            "Only a cancelled subscription can be reactivated.",
        )));
    }

    let sets = [
        (
            "status",
            Value::String(SubscriptionStatus::Active.as_str().to_string()),
        ),
        ("cancelled_at", Value::Null),
        ("ends_at", Value::Null),
    ];
    let row = CatalogService::update_columns(
        &state.pool,
        entity,
        id,
        &sets,
        Some(principal.user_id),
    )
    .await?
    .ok_or(AppError::NotFound)?;
    Ok(Json(Resource { data: row }))
}
