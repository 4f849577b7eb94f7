//! Generic CRUD execution against PostgreSQL.

use crate::error::{AppError, ValidationErrors};
use crate::registry::{CatalogModel, EntityDef};
use crate::sql::{self, EmbedSelect, ListSelect, PgBindValue, QueryBuf, RecordKey};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

pub struct CatalogService;

impl CatalogService {
    fn embeds<'a>(model: &'a CatalogModel, entity: &'a EntityDef) -> Vec<EmbedSelect<'a>> {
        entity
            .embeds
            .iter()
            .filter_map(|def| {
                model
                    .entity(def.related)
                    .map(|related| EmbedSelect { def, related })
            })
            .collect()
    }

    /// One page of rows plus the filtered total. Sensitive columns are
    /// stripped from every row.
    pub async fn page(
        pool: &PgPool,
        model: &CatalogModel,
        entity: &EntityDef,
        sel: &ListSelect,
    ) -> Result<(Vec<Value>, u64), AppError> {
        let embeds = Self::embeds(model, entity);
        let q = sql::select_page(entity, sel, &embeds);
        let mut rows = Self::query_many(pool, &q).await?;
        for row in &mut rows {
            strip_sensitive(entity, row);
        }
        let total = Self::query_i64(pool, &sql::count_rows(entity, sel)).await? as u64;
        Ok((rows, total))
    }

    /// Single row by id or slug, with embeds, sensitive columns stripped.
    pub async fn find(
        pool: &PgPool,
        model: &CatalogModel,
        entity: &EntityDef,
        key: &RecordKey,
        owner: Option<i64>,
    ) -> Result<Option<Value>, AppError> {
        let embeds = Self::embeds(model, entity);
        let q = sql::select_one(entity, key, owner, &embeds);
        let mut row = Self::query_one(pool, &q).await?;
        if let Some(row) = row.as_mut() {
            strip_sensitive(entity, row);
        }
        Ok(row)
    }

    /// Database-backed constraint checks: uniqueness of declared unique
    /// columns and existence of referenced parent rows. Runs before any
    /// mutation; failures merge into the same per-field map as rule errors.
    pub async fn check_constraints(
        pool: &PgPool,
        entity: &EntityDef,
        body: &HashMap<String, Value>,
        exclude_id: Option<i64>,
    ) -> Result<ValidationErrors, AppError> {
        let mut errors = ValidationErrors::new();
        for column in &entity.columns {
            if !column.unique || !entity.writable(column.name) {
                continue;
            }
            let Some(value) = body.get(column.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let q = sql::exists_unique(entity, column.name, value, exclude_id);
            if Self::query_bool(pool, &q).await? {
                errors.add(
                    column.name,
                    format!("The {} has already been taken.", column.name),
                );
            }
        }
        for fk in &entity.foreign_keys {
            let Some(value) = body.get(fk.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let q = sql::exists_related(fk.table, crate::registry::PK_COLUMN, value);
            if !Self::query_bool(pool, &q).await? {
                errors.add(fk.column, format!("The selected {} is invalid.", fk.column));
            }
        }
        Ok(errors)
    }

    /// Rows in child tables still referencing this id block the delete.
    pub async fn check_restrict_delete(
        pool: &PgPool,
        entity: &EntityDef,
        id: i64,
    ) -> Result<ValidationErrors, AppError> {
        let mut errors = ValidationErrors::new();
        let id_value = Value::Number(id.into());
        for child in &entity.restrict_delete {
            let q = sql::exists_related(child.table, child.fk_column, &id_value);
            if Self::query_bool(pool, &q).await? {
                errors.add(
                    "id",
                    format!("Cannot delete a record with related {}.", child.label),
                );
            }
        }
        Ok(errors)
    }

    /// Insert one row. `extra` carries server-supplied values (owner id,
    /// generated tokens, lifecycle fields) that override the body. The
    /// returned row is unstripped; callers decide what to reveal.
    pub async fn create(
        pool: &PgPool,
        entity: &EntityDef,
        body: &HashMap<String, Value>,
        extra: &[(&str, Value)],
    ) -> Result<Value, AppError> {
        let q = sql::insert(entity, body, extra);
        tracing::info!(entity = entity.path, "creating row");
        Self::query_one(pool, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update one row by id (optionally owner-scoped). Returns the updated
    /// row or None when no row matched.
    pub async fn update(
        pool: &PgPool,
        entity: &EntityDef,
        id: i64,
        body: &HashMap<String, Value>,
        owner: Option<i64>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::update(entity, id, body, owner);
        tracing::info!(entity = entity.path, id, "updating row");
        Self::query_one(pool, &q).await
    }

    /// Server-side lifecycle update: sets the given columns directly,
    /// bypassing body writability. Returns the updated row or None.
    pub async fn update_columns(
        pool: &PgPool,
        entity: &EntityDef,
        id: i64,
        sets: &[(&str, Value)],
        owner: Option<i64>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::update_columns(entity, id, sets, owner);
        tracing::info!(entity = entity.path, id, "updating lifecycle columns");
        Self::query_one(pool, &q).await
    }

    /// Delete one row by id. Returns whether a row was deleted.
    pub async fn delete(
        pool: &PgPool,
        entity: &EntityDef,
        id: i64,
        owner: Option<i64>,
    ) -> Result<bool, AppError> {
        let q = sql::delete(entity, id, owner);
        tracing::info!(entity = entity.path, id, "deleting row");
        Ok(Self::query_one(pool, &q).await?.is_some())
    }

    pub async fn query_many(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    pub async fn query_one(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        tracing::debug!(sql = %q.sql, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(pool).await?;
        Ok(row.as_ref().map(row_to_json))
    }

    pub async fn query_bool(pool: &PgPool, q: &QueryBuf) -> Result<bool, AppError> {
        tracing::debug!(sql = %q.sql, "query");
        let mut query = sqlx::query_scalar::<_, bool>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        Ok(query.fetch_one(pool).await?)
    }

    pub async fn query_i64(pool: &PgPool, q: &QueryBuf) -> Result<i64, AppError> {
        tracing::debug!(sql = %q.sql, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        Ok(query.fetch_one(pool).await?)
    }
}

/// Remove sensitive columns from a row in place.
pub fn strip_sensitive(entity: &EntityDef, row: &mut Value) {
    if entity.sensitive_columns.is_empty() {
        return;
    }
    if let Value::Object(map) = row {
        for column in entity.sensitive_columns {
            map.remove(*column);
        }
    }
}

pub fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}
