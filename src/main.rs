use std::sync::Arc;

use acervo_api::{
    apply_migrations, app_router, ensure_database_exists, AppState, CatalogModel, ServerConfig,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "acervo_api=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "loaded configuration");

    let model = CatalogModel::builtin()?;
    tracing::info!(entities = model.entities().len(), "catalog registry validated");

    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    apply_migrations(&pool, &model).await?;
    tracing::info!("database ready");

    let state = AppState {
        pool,
        model: Arc::new(model),
    };
    let app = app_router(state, config.body_limit_bytes);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
