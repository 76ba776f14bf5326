//! Database access for the time query endpoint
//!
//! Each call opens one TLS connection, runs a single query and closes the
//! connection again. Nothing is pooled between requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{DatabaseConfig, SslMode};

/// Database error types
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),
}

/// Source of the authoritative server time
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimestampSource: Send + Sync {
    async fn current_time(&self) -> Result<DateTime<Utc>, DatabaseError>;
}

/// PostgreSQL accessor that connects per call
pub struct Database {
    options: PgConnectOptions,
}

impl Database {
    pub fn new(config: &DatabaseConfig) -> Self {
        if config.is_plaintext() {
            warn!(
                host = %config.host,
                "Database connection is NOT encrypted, credentials are sent in plaintext"
            );
        } else if config.skips_certificate_validation() {
            warn!(
                host = %config.host,
                "Database TLS certificate validation is disabled"
            );
        }

        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.database)
            .application_name(env!("CARGO_PKG_NAME"))
            .ssl_mode(pg_ssl_mode(config.ssl_mode));

        if let Some(root_cert) = &config.ssl_root_cert {
            options = options.ssl_root_cert(root_cert);
        }

        Self { options }
    }

    async fn connect(&self) -> Result<PgConnection, DatabaseError> {
        PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }
}

#[async_trait]
impl TimestampSource for Database {
    async fn current_time(&self) -> Result<DateTime<Utc>, DatabaseError> {
        let mut conn = self.connect().await?;
        debug!("Database connection opened");

        let result = sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW() AS current_time")
            .fetch_one(&mut conn)
            .await;

        if let Err(e) = conn.close().await {
            warn!("Failed to close database connection cleanly: {}", e);
        }

        result.map_err(|e| DatabaseError::Query(e.to_string()))
    }
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_mapping() {
        assert!(matches!(pg_ssl_mode(SslMode::VerifyFull), PgSslMode::VerifyFull));
        assert!(matches!(pg_ssl_mode(SslMode::Require), PgSslMode::Require));
        assert!(matches!(pg_ssl_mode(SslMode::Disable), PgSslMode::Disable));
    }

    #[tokio::test]
    async fn test_unreachable_database_reports_connection_error() {
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "portfolio".to_string(),
            password: "secret".to_string(),
            database: "portfolio".to_string(),
            ssl_mode: SslMode::Disable,
            ssl_root_cert: None,
        };

        let db = Database::new(&config);
        let err = db.current_time().await.unwrap_err();
        assert!(matches!(err, DatabaseError::Connection(_)));
    }
}
