//! Environment-driven configuration.
//!
//! Everything is read from environment variables (`.env` is loaded by the
//! binary before this runs): `DATABASE_URL`, `SERVER_PORT`, `JWT_SECRET`.
//! The database is mandatory; the server refuses to start without it.

use std::net::SocketAddr;

use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Listener configuration.
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    /// Read the bind address from `SERVER_PORT` (default 8000).
    pub fn from_env() -> Self {
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
        }
    }
}

/// Connect to Postgres and bring the schema up to date.
pub async fn load_database() -> Result<PgPool, ConfigError> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database ready");

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_8000() {
        // SERVER_PORT is unset in the test environment unless a developer
        // exports it; tolerate both by checking the parse fallback directly.
        if std::env::var("SERVER_PORT").is_err() {
            let config = ServerConfig::from_env();
            assert_eq!(config.bind_addr.port(), 8000);
        }
    }
}
