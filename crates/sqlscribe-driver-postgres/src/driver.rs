//! PostgreSQL database driver

use async_trait::async_trait;
use sqlscribe_core::{Connection, ConnectionConfig, DatabaseDriver, Result, ScribeError};
use std::path::PathBuf;
use std::sync::Arc;

use crate::{PostgresConnection, SslMode};

const DEFAULT_PORT: u16 = 5432;

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        tracing::debug!("PostgreSQL driver initialized");
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn ssl_mode_of(config: &ConnectionConfig) -> Result<SslMode> {
    match config.get_string("ssl_mode") {
        Some(mode) => mode
            .parse()
            .map_err(|e: crate::TlsError| ScribeError::Configuration(e.to_string())),
        None => Ok(SslMode::default()),
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host, database = %config.database))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let port = if config.port > 0 { config.port } else { DEFAULT_PORT };
        let ssl_mode = ssl_mode_of(config)?;
        let root_cert = config
            .get_string("ssl_root_cert")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        let conn = PostgresConnection::connect(
            &config.host,
            port,
            &config.database,
            config.username.as_deref(),
            config.password.as_deref(),
            ssl_mode,
            root_cert.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to PostgreSQL database");
            e
        })?;

        Ok(Arc::new(conn))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let port = if config.port > 0 { config.port } else { DEFAULT_PORT };
        let mut conn_str = format!(
            "host={} port={} dbname={}",
            config.host, port, config.database
        );

        if let Some(user) = &config.username {
            conn_str.push_str(&format!(" user={}", user));
        }
        if config.password.is_some() {
            conn_str.push_str(" password=***");
        }
        if let Some(mode) = config.get_string("ssl_mode") {
            conn_str.push_str(&format!(" sslmode={}", mode));
        }

        conn_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_masks_password() {
        let config = ConnectionConfig::new("postgres", "db.internal", 0, "agent_db")
            .with_credentials("agent_user", "s3cret")
            .with_param("ssl_mode", "require");
        let conn_str = PostgresDriver::new().build_connection_string(&config);

        assert_eq!(
            conn_str,
            "host=db.internal port=5432 dbname=agent_db user=agent_user password=*** sslmode=require"
        );
        assert!(!conn_str.contains("s3cret"));
    }

    #[test]
    fn test_ssl_mode_defaults_to_prefer() {
        let config = ConnectionConfig::new("postgres", "localhost", 5432, "agent_db");
        assert_eq!(ssl_mode_of(&config).unwrap(), SslMode::Prefer);
    }

    #[test]
    fn test_unknown_ssl_mode_is_configuration_error() {
        let config = ConnectionConfig::new("postgres", "localhost", 5432, "agent_db")
            .with_param("ssl_mode", "sometimes");
        assert!(matches!(
            ssl_mode_of(&config),
            Err(ScribeError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        // Port 1 on loopback is never a PostgreSQL server
        let config = ConnectionConfig::new("postgres", "127.0.0.1", 1, "agent_db")
            .with_credentials("agent_user", "pw")
            .with_param("ssl_mode", "disable");
        let result = PostgresDriver::new().connect(&config).await;
        assert!(matches!(result, Err(ScribeError::Connection(_))));
    }
}
