//! PostgreSQL connection implementation

use async_trait::async_trait;
use sqlscribe_core::{
    CatalogIntrospection, ColumnMeta, Connection, QueryResult, Result, Row, ScribeError,
    Transaction, Value,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use futures::{StreamExt, pin_mut};
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};

use crate::tls::{SslMode, build_tls_connector};
use crate::values::{PgValue, postgres_to_value};

pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        if !detail.trim().is_empty() {
            message.push_str(&format!(" (detail: {})", detail));
        }
    }

    if let Some(hint) = db_error.hint() {
        if !hint.trim().is_empty() {
            message.push_str(&format!(" (hint: {})", hint));
        }
    }

    match db_error.code().code() {
        "25006" => format!("read-only transaction rejected the statement: {}", message),
        "42P01" => format!("undefined table: {}", message),
        "42703" => format!("undefined column: {}", message),
        "42601" => format!("syntax error: {}", message),
        code => format!("{} (sqlstate {})", message, code),
    }
}

type SharedClient = Arc<Mutex<Option<Client>>>;

/// PostgreSQL connection wrapper.
///
/// The client sits behind a mutex so a transaction handle and the connection
/// share one session; `close` takes the client out, which ends the session.
pub struct PostgresConnection {
    client: SharedClient,
    closed: AtomicBool,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database
    pub async fn connect(
        host: &str,
        port: u16,
        database: &str,
        user: Option<&str>,
        password: Option<&str>,
        ssl_mode: SslMode,
        ssl_root_cert: Option<&Path>,
    ) -> Result<Self> {
        tracing::info!(
            host = %host,
            port = %port,
            database = %database,
            ssl_mode = %ssl_mode,
            "connecting to PostgreSQL database"
        );

        let mut config = tokio_postgres::Config::new();
        config
            .host(host)
            .port(port)
            .dbname(database)
            .application_name("sqlscribe")
            .ssl_mode(ssl_mode.negotiation());

        if let Some(u) = user {
            config.user(u);
        }
        if let Some(p) = password {
            config.password(p);
        }

        let client = if ssl_mode.uses_tls() {
            let tls = build_tls_connector(ssl_mode, ssl_root_cert)
                .map_err(|e| ScribeError::Configuration(e.to_string()))?;
            let (client, connection) = config.connect(tls).await.map_err(|e| {
                ScribeError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            client
        } else {
            let (client, connection) = config.connect(NoTls).await.map_err(|e| {
                ScribeError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            client
        };

        tracing::info!(host = %host, database = %database, "PostgreSQL connection established");
        Ok(Self {
            client: Arc::new(Mutex::new(Some(client))),
            closed: AtomicBool::new(false),
        })
    }
}

fn closed_error() -> ScribeError {
    ScribeError::Connection("PostgreSQL connection is closed".into())
}

/// Prepare, bind and run a row-returning statement on a locked client.
///
/// Rows are streamed; with `max_rows` set, reading stops once that many have arrived.
async fn run_query(
    client: &Client,
    sql: &str,
    params: &[Value],
    max_rows: Option<usize>,
) -> Result<QueryResult> {
    tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing query");

    let start_time = std::time::Instant::now();

    // Prepare first so each parameter is bound with the width the server expects
    let statement = client.prepare(sql).await.map_err(|e| {
        ScribeError::Query(format!("Failed to prepare query: {}", format_postgres_error(&e)))
    })?;

    let param_types = statement.params();
    let pg_params: Vec<PgValue> = params
        .iter()
        .enumerate()
        .map(|(i, value)| PgValue::for_param(value, param_types.get(i)))
        .collect();

    let stream = client.query_raw(&statement, pg_params.iter()).await.map_err(|e| {
        ScribeError::Query(format!("Failed to execute query: {}", format_postgres_error(&e)))
    })?;
    pin_mut!(stream);

    // Column metadata comes from the statement so empty results still carry headers
    let columns: Vec<ColumnMeta> = statement
        .columns()
        .iter()
        .enumerate()
        .map(|(ordinal, col)| ColumnMeta {
            name: col.name().to_string(),
            data_type: col.type_().name().to_string(),
            ordinal,
        })
        .collect();
    let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

    let cap = max_rows.unwrap_or(usize::MAX);
    let mut rows = Vec::new();
    while rows.len() < cap {
        let Some(next) = stream.next().await else {
            break;
        };
        let pg_row = next.map_err(|e| {
            ScribeError::Query(format!("Failed to read row: {}", format_postgres_error(&e)))
        })?;
        let values = (0..columns.len())
            .map(|idx| postgres_to_value(&pg_row, idx))
            .collect();
        rows.push(Row::new(column_names.clone(), values));
    }
    if rows.len() == cap {
        // Dropping the stream discards whatever the server still sends
        tracing::debug!(max_rows = cap, "stopped reading at row cap");
    }

    Ok(QueryResult {
        columns,
        rows,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    })
}

async fn run_control(client: &SharedClient, statement: &str) -> Result<()> {
    let guard = client.lock().await;
    let client = guard.as_ref().ok_or_else(closed_error)?;
    client.batch_execute(statement).await.map_err(|e| {
        ScribeError::Query(format!("{} failed: {}", statement, format_postgres_error(&e)))
    })
}

/// Read-only transaction sharing the connection's session
pub struct PostgresTransaction {
    client: SharedClient,
    finished: bool,
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if !self.finished {
            // The server rolls the transaction back when the session ends
            tracing::warn!("PostgreSQL transaction dropped without commit or rollback");
        }
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("committing PostgreSQL transaction");
        self.finished = true;
        run_control(&self.client, "COMMIT").await
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        tracing::debug!("rolling back PostgreSQL transaction");
        self.finished = true;
        run_control(&self.client, "ROLLBACK").await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed_error)?;
        run_query(client, sql, params, None).await
    }

    async fn query_capped(
        &self,
        sql: &str,
        params: &[Value],
        max_rows: usize,
    ) -> Result<QueryResult> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed_error)?;
        run_query(client, sql, params, Some(max_rows)).await
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgres"
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or_else(closed_error)?;
        run_query(client, sql, params, None).await
    }

    async fn begin_read_only(&self) -> Result<Box<dyn Transaction>> {
        tracing::debug!("beginning read-only PostgreSQL transaction");
        run_control(&self.client, "START TRANSACTION READ ONLY").await?;
        Ok(Box::new(PostgresTransaction {
            client: Arc::clone(&self.client),
            finished: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("closing PostgreSQL connection");
        // Dropping the client ends the background connection task
        self.client.lock().await.take();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return true;
        }
        // A busy client is in use by a query, so it was alive a moment ago
        match self.client.try_lock() {
            Ok(guard) => guard.as_ref().is_none_or(Client::is_closed),
            Err(_) => false,
        }
    }

    fn as_catalog(&self) -> Option<&dyn CatalogIntrospection> {
        Some(self)
    }
}
