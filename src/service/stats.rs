//! Read-only aggregates for entities with a statistics spec.

use super::crud::CatalogService;
use crate::error::AppError;
use crate::registry::EntityDef;
use crate::sql;
use serde_json::{json, Value};
use sqlx::PgPool;

pub struct StatisticsService;

impl StatisticsService {
    /// Total count, counts per group value, and the optional numeric
    /// summary / top-N declared by the entity. Entities without a
    /// statistics spec have no statistics endpoint.
    pub async fn compute(pool: &PgPool, entity: &EntityDef) -> Result<Value, AppError> {
        let stats = entity.statistics.as_ref().ok_or(AppError::NotFound)?;

        let total = CatalogService::query_i64(pool, &sql::count_all(entity)).await?;
        let groups =
            CatalogService::query_many(pool, &sql::group_counts(entity, stats.group_by)).await?;

        let mut out = json!({ "total": total });
        out[format!("by_{}", stats.group_by)] = Value::Array(groups);

        if let Some(numeric) = stats.numeric {
            let summary =
                CatalogService::query_one(pool, &sql::numeric_summary(entity, numeric)).await?;
            out[numeric] = summary.unwrap_or(Value::Null);
        }
        if let Some(top) = &stats.top {
            let rows =
                CatalogService::query_many(pool, &sql::top_rows(entity, top.by, top.limit)).await?;
            out[format!("top_by_{}", top.by)] = Value::Array(rows);
        }
        Ok(out)
    }
}
