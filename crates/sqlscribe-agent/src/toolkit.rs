//! Read-only database tools the model can call

use serde::Deserialize;
use serde_json::{Value as Json, json};
use sqlscribe_core::{Connection, ConnectionConfig, DatabaseDriver, Result, ScribeError};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const LIST_TABLES: &str = "list_tables";
pub const DESCRIBE_TABLE: &str = "describe_table";
pub const RUN_SQL_QUERY: &str = "run_sql_query";

#[derive(Debug, Deserialize)]
struct DescribeTableArgs {
    table_name: String,
}

#[derive(Debug, Deserialize)]
struct RunSqlQueryArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

/// Database tools bound to one connection, opened on first use and
/// reopened when the server has dropped it.
///
/// Tool failures come back as `{"status": "error", "message": ...}` so the
/// model can read them and try again.
pub struct SqlToolkit {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
    max_rows: usize,
    connection: Mutex<Option<Arc<dyn Connection>>>,
}

impl SqlToolkit {
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig, max_rows: usize) -> Self {
        Self {
            driver,
            config,
            max_rows: max_rows.max(1),
            connection: Mutex::new(None),
        }
    }

    /// Function-calling definitions in chat-completions `tools` format
    pub fn definitions() -> Json {
        json!([
            {
                "type": "function",
                "function": {
                    "name": LIST_TABLES,
                    "description": "List the base tables in the database schema.",
                    "parameters": {"type": "object", "properties": {}, "required": []}
                }
            },
            {
                "type": "function",
                "function": {
                    "name": DESCRIBE_TABLE,
                    "description": "Describe the columns of one table: name, type, nullability, default, length and precision.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "table_name": {"type": "string", "description": "Table to describe"}
                        },
                        "required": ["table_name"]
                    }
                }
            },
            {
                "type": "function",
                "function": {
                    "name": RUN_SQL_QUERY,
                    "description": "Run one read-only SQL query and return its rows as JSON. Writes are rejected.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "query": {"type": "string", "description": "A single SQL statement"},
                            "limit": {"type": "integer", "description": "Maximum rows to return"}
                        },
                        "required": ["query"]
                    }
                }
            }
        ])
    }

    /// Run a tool by name with its JSON-encoded arguments
    #[tracing::instrument(skip(self, arguments))]
    pub async fn call(&self, name: &str, arguments: &str) -> Json {
        let outcome = match name {
            LIST_TABLES => self.list_tables().await,
            DESCRIBE_TABLE => match parse_args::<DescribeTableArgs>(arguments) {
                Ok(args) => self.describe_table(&args.table_name).await,
                Err(e) => Err(e),
            },
            RUN_SQL_QUERY => match parse_args::<RunSqlQueryArgs>(arguments) {
                Ok(args) => self.run_sql_query(&args.query, args.limit).await,
                Err(e) => Err(e),
            },
            other => Err(ScribeError::NotFound(format!("unknown tool '{}'", other))),
        };

        outcome.unwrap_or_else(|e| {
            tracing::warn!(tool = %name, error = %e, "tool call failed");
            json!({"status": "error", "message": e.to_string()})
        })
    }

    /// Close the connection if one was opened
    pub async fn close(&self) {
        let conn = self.connection.lock().await.take();
        if let Some(conn) = conn {
            if let Err(e) = conn.close().await {
                tracing::warn!(error = %e, "failed to close agent connection");
            }
        }
    }

    async fn connection(&self) -> Result<Arc<dyn Connection>> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            if !conn.is_closed() {
                return Ok(Arc::clone(conn));
            }
            tracing::warn!("agent database connection was closed by the server; reconnecting");
        }

        tracing::info!(
            target_db = %self.driver.build_connection_string(&self.config),
            "opening agent database connection"
        );
        let conn = self.driver.connect(&self.config).await?;
        *slot = Some(Arc::clone(&conn));
        Ok(conn)
    }

    async fn list_tables(&self) -> Result<Json> {
        let conn = self.connection().await?;
        let catalog = catalog_of(conn.as_ref())?;
        let tables = catalog.list_base_tables(&self.config.schema).await?;
        Ok(json!({"status": "success", "type": "tables", "schema": self.config.schema, "tables": tables}))
    }

    async fn describe_table(&self, table: &str) -> Result<Json> {
        let conn = self.connection().await?;
        let catalog = catalog_of(conn.as_ref())?;
        let columns = catalog.describe_table(&self.config.schema, table).await?;
        if columns.is_empty() {
            return Err(ScribeError::NotFound(format!(
                "table '{}' not found in schema '{}'",
                table, self.config.schema
            )));
        }
        Ok(json!({
            "status": "success",
            "type": "describe",
            "table": table,
            "columns": serde_json::to_value(&columns)?,
        }))
    }

    async fn run_sql_query(&self, query: &str, limit: Option<usize>) -> Result<Json> {
        let conn = self.connection().await?;
        let limit = limit.unwrap_or(self.max_rows).clamp(1, self.max_rows);
        let tx = conn.begin_read_only().await?;
        // One extra row tells whether the result was cut off
        let outcome = tx.query_capped(query, &[], limit + 1).await;
        // Nothing to keep; a read-only transaction always ends in rollback
        if let Err(e) = tx.rollback().await {
            tracing::warn!(error = %e, "failed to roll back query transaction");
        }
        let result = outcome?;

        let truncated = result.row_count() > limit;
        let data: Vec<Json> = result
            .rows
            .iter()
            .take(limit)
            .map(|row| Json::Object(row.to_json_object()))
            .collect();

        tracing::debug!(
            returned = data.len(),
            truncated,
            elapsed_ms = result.execution_time_ms,
            "query tool finished"
        );

        Ok(json!({
            "status": "success",
            "type": "select",
            "headers": result.column_names(),
            "row_count": data.len(),
            "data": data,
            "truncated": truncated,
        }))
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: &str) -> Result<T> {
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments)
        .map_err(|e| ScribeError::Query(format!("invalid tool arguments: {}", e)))
}

fn catalog_of(conn: &dyn Connection) -> Result<&dyn sqlscribe_core::CatalogIntrospection> {
    conn.as_catalog().ok_or_else(|| {
        ScribeError::NotSupported(format!(
            "{} connections cannot introspect the catalog",
            conn.driver_name()
        ))
    })
}
