//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while validating the entity registry at startup.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("entity {entity}: unknown column '{column}' referenced by {referrer}")]
    UnknownColumn {
        entity: String,
        column: String,
        referrer: &'static str,
    },
    #[error("entity {entity}: unknown related entity '{related}'")]
    UnknownRelated { entity: String, related: String },
    #[error("entity {entity}: {reason}")]
    Invalid { entity: String, reason: String },
}

/// Per-field validation messages, keyed by field name.
///
/// Serializes to the `errors` object of a 422 response. BTreeMap keeps the
/// field order stable for clients and tests.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Single-field shorthand for pre-check failures (duplicate subscription,
    /// restrict-delete and the like).
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Fails with a 422 if any message has been collected.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Resource not found.")]
    NotFound,
    #[error("Unauthenticated.")]
    Unauthenticated,
    #[error("The given data was invalid.")]
    Validation(ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("This endpoint is under development.")]
    Unimplemented,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

fn plain(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        message: message.to_string(),
        errors: None,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Registry(e) => {
                tracing::error!(error = %e, "registry error");
                plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
            AppError::NotFound => plain(StatusCode::NOT_FOUND, "Resource not found."),
            AppError::Unauthenticated => plain(StatusCode::UNAUTHORIZED, "Unauthenticated."),
            AppError::Validation(errors) => {
                let body = ErrorBody {
                    message: "The given data was invalid.".to_string(),
                    errors: Some(errors),
                };
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            AppError::BadRequest(message) => plain(StatusCode::BAD_REQUEST, &message),
            AppError::Unimplemented => {
                plain(StatusCode::NOT_IMPLEMENTED, "This endpoint is under development.")
            }
            AppError::Db(e) => db_error_response(e),
        }
    }
}

/// Map a sqlx error to a response. Constraint violations that slip past the
/// pre-checks (the read-then-write race window) still answer 422 rather than
/// surfacing the storage engine's error; everything else is a sanitized 500.
fn db_error_response(e: sqlx::Error) -> Response {
    match &e {
        sqlx::Error::RowNotFound => plain(StatusCode::NOT_FOUND, "Resource not found."),
        sqlx::Error::Database(db)
            if matches!(db.code().as_deref(), Some("23505") | Some("23503")) =>
        {
            tracing::warn!(
                constraint = db.constraint().unwrap_or("unknown"),
                "constraint violation reached the database"
            );
            plain(
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given data was invalid.",
            )
        }
        _ => {
            tracing::error!(error = %e, "database error");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("slug", "slug is required");
        errors.add("slug", "slug must be unique");
        errors.add("name", "name is required");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["slug"].as_array().unwrap().len(), 2);
        assert_eq!(json["name"][0], "name is required");
    }

    #[test]
    fn merge_appends_to_existing_fields() {
        let mut a = ValidationErrors::single("slug", "taken");
        a.merge(ValidationErrors::single("slug", "too long"));
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["slug"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn empty_errors_pass_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        assert!(ValidationErrors::single("x", "bad").into_result().is_err());
    }
}
