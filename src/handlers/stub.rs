//! Explicitly unimplemented resources.
//!
//! Their contract is undefined in the source system; answering 501 is the
//! honest behavior until a real contract exists.

use crate::error::AppError;

pub async fn under_development() -> AppError {
    AppError::Unimplemented
}
