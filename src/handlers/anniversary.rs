//! Calendar lookup for daily anniversaries.

use super::entity::parse_list_params;
use crate::error::{AppError, ValidationErrors};
use crate::registry::FilterKind;
use crate::response::{Page, PageMeta};
use crate::service::CatalogService;
use crate::sql::Filter;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn require_int_param(
    params: &HashMap<String, String>,
    name: &str,
    min: i64,
    max: i64,
    errors: &mut ValidationErrors,
) -> i64 {
    match params.get(name) {
        None => {
            errors.add(name, format!("The {} field is required.", name));
            0
        }
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if (min..=max).contains(&n) => n,
            Ok(_) => {
                errors.add(name, format!("The {} must be between {} and {}.", name, min, max));
                0
            }
            Err(_) => {
                errors.add(name, format!("The {} must be an integer.", name));
                0
            }
        },
    }
}

/// GET /daily-anniversaries/by-date?month=&day=
///
/// Anniversaries falling on one calendar day, paginated like any list.
pub async fn by_date(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Page<Value>>, AppError> {
    let entity = state
        .model
        .entity("daily-anniversaries")
        .ok_or(AppError::NotFound)?;

    let mut errors = ValidationErrors::new();
    let _month = require_int_param(&params, "month", 1, 12, &mut errors);
    let day = require_int_param(&params, "day", 1, 31, &mut errors);
    errors.into_result()?;

    // month is a declared filter and is already in the selection; day is
    // specific to this endpoint.
    let mut lp = parse_list_params(entity, &params, None)?;
    lp.select.filters.push(Filter {
        column: "day".to_string(),
        value: Value::Number(day.into()),
        kind: FilterKind::Equals,
    });

    let (rows, total) = CatalogService::page(&state.pool, &state.model, entity, &lp.select).await?;
    Ok(Json(Page {
        data: rows,
        meta: PageMeta::new(lp.page, lp.per_page, total),
    }))
}
