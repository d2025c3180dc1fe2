//! Driver trait and connection settings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{Connection, Result};

/// Opens connections for one database engine
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Get the driver identifier (e.g., "postgres")
    fn name(&self) -> &'static str;

    /// Human-readable engine name
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Build a connection string with the password masked, for logs and diagnostics
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}

/// Settings needed to open a database session
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "postgres")
    pub driver: String,
    pub host: String,
    /// Port number (0 for the driver default)
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Catalog namespace the schema reader and toolkit operate on
    pub schema: String,
    /// Additional driver-specific parameters (e.g. `ssl_mode`, `ssl_root_cert`)
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    pub fn new(driver: &str, host: &str, port: u16, database: &str) -> Self {
        Self {
            driver: driver.to_string(),
            host: host.to_string(),
            port,
            database: database.to_string(),
            username: None,
            password: None,
            schema: "public".to_string(),
            params: HashMap::new(),
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    /// Set an additional parameter
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Look up a setting, checking extra params before the well-known fields
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        match key {
            "host" => Some(self.host.clone()),
            "database" => Some(self.database.clone()),
            "username" | "user" => self.username.clone(),
            "password" => self.password.clone(),
            "schema" => Some(self.schema.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("schema", &self.schema)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_string_prefers_params() {
        let config = ConnectionConfig::new("postgres", "db.internal", 5432, "agent_db")
            .with_param("host", "override.internal");
        assert_eq!(config.get_string("host").as_deref(), Some("override.internal"));
        assert_eq!(config.get_string("database").as_deref(), Some("agent_db"));
        assert_eq!(config.get_string("schema").as_deref(), Some("public"));
        assert_eq!(config.get_string("ssl_mode"), None);
    }

    #[test]
    fn test_debug_masks_password() {
        let config = ConnectionConfig::new("postgres", "localhost", 5432, "agent_db")
            .with_credentials("agent_user", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
