//! Request-scoped principal for ownership-scoped resources.
//!
//! Replaces a global authenticated-user accessor: handlers that need the
//! caller take `Principal` explicitly. The bearer value is the user id;
//! verifying real credentials is a front-proxy concern, out of scope here.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// The authenticated caller. Extraction fails with 401 when the
/// `Authorization: Bearer <user id>` header is missing or malformed.
#[derive(Clone, Copy, Debug)]
pub struct Principal {
    pub user_id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthenticated)?;
        let user_id: i64 = token.parse().map_err(|_| AppError::Unauthenticated)?;
        if user_id <= 0 {
            return Err(AppError::Unauthenticated);
        }
        Ok(Principal { user_id })
    }
}
