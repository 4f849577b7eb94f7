//! Statistics endpoints for entities declaring a statistics spec.

use super::entity::public_entity;
use crate::error::AppError;
use crate::registry::Operation;
use crate::response::Resource;
use crate::service::StatisticsService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

/// GET /{resource}/statistics
///
/// 404 for entities without a statistics spec, same as an unknown resource.
pub async fn statistics(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<Json<Resource<Value>>, AppError> {
    let entity = public_entity(&state.model, &resource, Operation::List)?;
    let data = StatisticsService::compute(&state.pool, entity).await?;
    Ok(Json(Resource { data }))
}
