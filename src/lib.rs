//! Acervo API: registry-driven catalog REST backend.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::ServerConfig;
pub use error::{AppError, RegistryError, ValidationErrors};
pub use migration::{apply_migrations, ensure_database_exists};
pub use registry::CatalogModel;
pub use routes::{app_router, common_routes, entity_routes};
pub use service::{CatalogService, RequestValidator, StatisticsService};
pub use state::AppState;
