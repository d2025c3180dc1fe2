//! Command-line and environment configuration

use clap::Parser;
use sqlscribe_agent::AgentSettings;
use sqlscribe_core::{ConnectionConfig, TableSelection};
use sqlscribe_driver_postgres::SslMode;
use sqlscribe_schema::SequenceDefaultPolicy;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set to a non-empty value")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Ask questions about a PostgreSQL database in plain language
#[derive(Parser)]
#[command(name = "sqlscribe", version, about)]
pub struct Args {
    /// Database user
    #[arg(long, env = "POSTGRES_USER", default_value = "agent_user")]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "POSTGRES_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "POSTGRES_HOST", default_value = "localhost")]
    pub db_host: String,

    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    pub db_port: u16,

    #[arg(long, env = "POSTGRES_DB", default_value = "agent_db")]
    pub db_name: String,

    /// Schema the catalog is read from and the agent queries
    #[arg(long, env = "POSTGRES_SCHEMA", default_value = "public")]
    pub db_schema: String,

    /// disable, prefer, require, verify-ca or verify-full
    #[arg(long, env = "POSTGRES_SSLMODE", default_value = "prefer")]
    pub ssl_mode: String,

    /// CA certificate (PEM) used to verify the server
    #[arg(long, env = "POSTGRES_SSLROOTCERT")]
    pub ssl_root_cert: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat model used by the agent
    #[arg(long, env = "SQLSCRIBE_MODEL", default_value = sqlscribe_agent::DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = sqlscribe_agent::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Comma-separated tables whose schema is shown and given to the agent
    #[arg(
        long,
        env = "SQLSCRIBE_TABLES",
        value_delimiter = ',',
        default_value = "employees,departments"
    )]
    pub tables: Vec<String>,

    /// Use every base table in the schema instead of --tables
    #[arg(long)]
    pub all_tables: bool,

    /// Keep sequence-backed DEFAULT clauses in the reconstructed DDL
    #[arg(long)]
    pub keep_sequence_defaults: bool,

    #[arg(long, env = "SQLSCRIBE_MAX_TOOL_ROUNDS", default_value_t = 8)]
    pub max_tool_rounds: usize,

    #[arg(long, env = "SQLSCRIBE_MAX_RESULT_ROWS", default_value_t = 200)]
    pub max_result_rows: usize,

    /// Also write JSON logs to the platform data directory
    #[arg(long, env = "SQLSCRIBE_LOG_JSON")]
    pub log_json: bool,
}

/// Validated, typed configuration
#[derive(Debug)]
pub struct Settings {
    pub connection: ConnectionConfig,
    pub agent: AgentSettings,
    pub selection: TableSelection,
    pub sequence_defaults: SequenceDefaultPolicy,
}

impl Settings {
    /// Label for the schema view header, e.g. `employees, departments`
    pub fn tables_label(&self) -> String {
        match self.selection.requested() {
            Some(names) => names.join(", "),
            None => format!("all tables in {}", self.connection.schema),
        }
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingCredential(name))
}

impl Args {
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let password = required(self.db_password, "POSTGRES_PASSWORD")?;
        let api_key = required(self.openai_api_key, "OPENAI_API_KEY")?;

        let ssl_mode: SslMode = self
            .ssl_mode
            .parse()
            .map_err(|e: sqlscribe_driver_postgres::TlsError| ConfigError::Invalid(e.to_string()))?;

        let mut connection = ConnectionConfig::new("postgres", &self.db_host, self.db_port, &self.db_name)
            .with_credentials(&self.db_user, &password)
            .with_schema(&self.db_schema)
            .with_param("ssl_mode", ssl_mode.as_str());
        if let Some(path) = self.ssl_root_cert.as_deref().filter(|p| !p.is_empty()) {
            connection = connection.with_param("ssl_root_cert", path);
        }

        let mut agent = AgentSettings::new(&api_key);
        agent.model = self.model;
        agent.base_url = self.openai_base_url;
        agent.max_tool_rounds = self.max_tool_rounds;
        agent.max_result_rows = self.max_result_rows;
        agent
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let selection = if self.all_tables {
            TableSelection::All
        } else {
            TableSelection::from_names(&self.tables)
        };

        let sequence_defaults = if self.keep_sequence_defaults {
            SequenceDefaultPolicy::Keep
        } else {
            SequenceDefaultPolicy::Strip
        };

        Ok(Settings {
            connection,
            agent,
            selection,
            sequence_defaults,
        })
    }
}
