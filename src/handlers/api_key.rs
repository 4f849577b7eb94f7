//! API key handlers. Rows are scoped to the authenticated user; a key owned
//! by someone else answers 404, never 403, so existence is not leaked.

use super::entity::{body_to_map, parse_id, parse_list_params};
use crate::error::AppError;
use crate::registry::EntityDef;
use crate::response::{Page, PageMeta, Resource};
use crate::service::{strip_sensitive, CatalogService, RequestValidator};
use crate::sql::RecordKey;
use crate::state::AppState;
use crate::extractors::Principal;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn entity(state: &AppState) -> Result<&EntityDef, AppError> {
    state.model.entity("api-keys").ok_or(AppError::NotFound)
}

pub async fn list(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Value>>, AppError> {
    let entity = entity(&state)?;
    let lp = parse_list_params(entity, &params, Some(principal.user_id))?;
    let (rows, total) = CatalogService::page(&state.pool, &state.model, entity, &lp.select).await?;
    Ok(Json(Page {
        data: rows,
        meta: PageMeta::new(lp.page, lp.per_page, total),
    }))
}

/// POST /api-keys
///
/// The token is generated server-side and revealed only in this response;
/// list and show strip it.
pub async fn create(
    principal: Principal,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Resource<Value>>), AppError> {
    let entity = entity(&state)?;
    let body = body_to_map(body)?;
    RequestValidator::validate_create(entity, &body).into_result()?;
    let token = uuid::Uuid::new_v4().to_string();
    let extra = [
        ("user_id", Value::Number(principal.user_id.into())),
        ("token", Value::String(token)),
    ];
    let row = CatalogService::create(&state.pool, entity, &body, &extra).await?;
    Ok((StatusCode::CREATED, Json(Resource { data: row })))
}

pub async fn show(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Resource<Value>>, AppError> {
    let entity = entity(&state)?;
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
    Ok(Json(Resource { data: row }))
}

pub async fn update(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Resource<Value>>, AppError> {
    let entity = entity(&state)?;
    let id = parse_id(&id)?;
    CatalogService::find(
        &state.pool,
        &state.model,
        entity,
        &RecordKey::Id(id),
        Some(principal.user_id),
    )
    .await?
    .ok_or(AppError::NotFound)?;
    let body = body_to_map(body)?;
    RequestValidator::validate_update(entity, &body).into_result()?;
    let mut row = CatalogService::update(&state.pool, entity, id, &body, Some(principal.user_id))
        .await?
        .ok_or(AppError::NotFound)?;
    strip_sensitive(entity, &mut row);
    Ok(Json(Resource { data: row }))
}

pub async fn destroy(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let entity = entity(&state)?;
    let id = parse_id(&id)?;
    if !CatalogService::delete(&state.pool, entity, id, Some(principal.user_id)).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
