//! Server configuration loaded from environment variables.

/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default `0.0.0.0`).
    pub host: String,
    /// Bind port (default `3000`).
    pub port: u16,
    /// PostgreSQL connection string (default `postgres://localhost/acervo`).
    pub database_url: String,
    /// Pool size (default `5`).
    pub max_connections: u32,
    /// Request body limit in bytes (default 1 MiB).
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    /// | Env var           | Default                      |
    /// |-------------------|------------------------------|
    /// | `HOST`            | `0.0.0.0`                    |
    /// | `PORT`            | `3000`                       |
    /// | `DATABASE_URL`    | `postgres://localhost/acervo`|
    /// | `MAX_CONNECTIONS` | `5`                          |
    /// | `BODY_LIMIT_BYTES`| `1048576`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/acervo".into());
        let max_connections: u32 = std::env::var("MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("MAX_CONNECTIONS must be a valid u32");
        let body_limit_bytes: usize = std::env::var("BODY_LIMIT_BYTES")
            .unwrap_or_else(|_| "1048576".into())
            .parse()
            .expect("BODY_LIMIT_BYTES must be a valid usize");

        Self {
            host,
            port,
            database_url,
            max_connections,
            body_limit_bytes,
        }
    }
}
