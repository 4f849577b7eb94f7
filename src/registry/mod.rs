pub mod catalog;
pub mod resolved;
pub mod types;
pub mod validator;

pub use catalog::{builtin, STUB_RESOURCES};
pub use resolved::CatalogModel;
pub use types::*;
pub use validator::validate;
