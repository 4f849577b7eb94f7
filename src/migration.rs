//! Apply the registry to the database: CREATE TABLE, UNIQUE, foreign keys.
//! Tables are created in catalog order, parents before children.

use crate::error::AppError;
use crate::registry::{CatalogModel, PgType, PK_COLUMN};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Create every catalog table if absent, then add foreign keys. Idempotent:
/// CREATE TABLE IF NOT EXISTS, and constraint creation ignores "already
/// exists" failures the way re-running a bootstrap should.
pub async fn apply_migrations(pool: &PgPool, model: &CatalogModel) -> Result<(), AppError> {
    for entity in model.entities() {
        let mut col_defs: Vec<String> = Vec::new();
        for c in &entity.columns {
            let mut def = format!("{} {}", quote(c.name), c.pg_type.ddl());
            if c.pg_type == PgType::BigSerial {
                def.push_str(" PRIMARY KEY");
            } else {
                if !c.nullable {
                    def.push_str(" NOT NULL");
                }
                if let Some(expr) = c.default {
                    def.push_str(" DEFAULT ");
                    def.push_str(expr);
                }
                if c.unique {
                    def.push_str(" UNIQUE");
                }
            }
            col_defs.push(def);
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quote(entity.table),
            col_defs.join(",\n  ")
        );
        tracing::debug!(table = entity.table, "ensuring table");
        sqlx::query(&sql).execute(pool).await?;
    }

    for entity in model.entities() {
        for fk in &entity.foreign_keys {
            let constraint = format!("fk_{}_{}", entity.table, fk.column);
            let sql = format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                quote(entity.table),
                quote(&constraint),
                quote(fk.column),
                quote(fk.table),
                quote(PK_COLUMN)
            );
            let _ = sqlx::query(&sql).execute(pool).await;
        }
    }

    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects
/// to the default `postgres` database to run CREATE DATABASE. Call before
/// creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(AppError::Db)?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&db_name)
            .fetch_one(&mut conn)
            .await
            .map_err(AppError::Db)?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}
