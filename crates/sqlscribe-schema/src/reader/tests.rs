//! Tests for the catalog reader

use super::*;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sqlscribe_core::{QueryResult, Result, Transaction, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counts every round-trip and lifecycle call the reader makes
#[derive(Default)]
struct CallLog {
    list_tables: AtomicUsize,
    columns: AtomicUsize,
    primary_keys: AtomicUsize,
    foreign_keys: AtomicUsize,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    closes: AtomicUsize,
}

impl CallLog {
    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn metadata_queries(&self) -> usize {
        Self::count(&self.columns) + Self::count(&self.primary_keys) + Self::count(&self.foreign_keys)
    }
}

#[derive(Clone, Default)]
struct FakeCatalog {
    tables: Vec<String>,
    columns: Vec<ColumnSpec>,
    primary_keys: Vec<PrimaryKeySpec>,
    foreign_keys: Vec<ForeignKeySpec>,
    fail_columns: bool,
    log: Arc<CallLog>,
}

fn only<T: Clone>(items: &[T], tables: &[String], table_of: impl Fn(&T) -> &str) -> Vec<T> {
    items
        .iter()
        .filter(|item| tables.iter().any(|t| t == table_of(item)))
        .cloned()
        .collect()
}

#[async_trait]
impl CatalogIntrospection for FakeCatalog {
    async fn list_base_tables(&self, _schema: &str) -> Result<Vec<String>> {
        self.log.list_tables.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.clone())
    }

    async fn get_columns_batch(&self, _schema: &str, tables: &[String]) -> Result<Vec<ColumnSpec>> {
        self.log.columns.fetch_add(1, Ordering::SeqCst);
        if self.fail_columns {
            return Err(ScribeError::Query("canceling statement due to statement timeout".into()));
        }
        Ok(only(&self.columns, tables, |c| c.table.as_str()))
    }

    async fn get_primary_keys_batch(
        &self,
        _schema: &str,
        tables: &[String],
    ) -> Result<Vec<PrimaryKeySpec>> {
        self.log.primary_keys.fetch_add(1, Ordering::SeqCst);
        Ok(only(&self.primary_keys, tables, |k| k.table.as_str()))
    }

    async fn get_foreign_keys_batch(
        &self,
        _schema: &str,
        tables: &[String],
    ) -> Result<Vec<ForeignKeySpec>> {
        self.log.foreign_keys.fetch_add(1, Ordering::SeqCst);
        Ok(only(&self.foreign_keys, tables, |fk| fk.table.as_str()))
    }
}

struct FakeTransaction {
    log: Arc<CallLog>,
}

#[async_trait]
impl Transaction for FakeTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.log.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.log.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Ok(QueryResult::default())
    }
}

struct FakeConnection {
    catalog: Option<FakeCatalog>,
    log: Arc<CallLog>,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for FakeConnection {
    fn driver_name(&self) -> &str {
        "fake"
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        Ok(QueryResult::default())
    }

    async fn begin_read_only(&self) -> Result<Box<dyn Transaction>> {
        self.log.begins.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeTransaction {
            log: Arc::clone(&self.log),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_catalog(&self) -> Option<&dyn CatalogIntrospection> {
        self.catalog.as_ref().map(|c| c as &dyn CatalogIntrospection)
    }
}

struct FakeDriver {
    catalog: FakeCatalog,
    refuse_connections: bool,
}

#[async_trait]
impl DatabaseDriver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        if self.refuse_connections {
            return Err(ScribeError::Connection(
                "password authentication failed for user \"agent_user\"".into(),
            ));
        }
        Ok(Arc::new(FakeConnection {
            catalog: Some(self.catalog.clone()),
            log: Arc::clone(&self.catalog.log),
            closed: AtomicBool::new(false),
        }))
    }

    fn build_connection_string(&self, _config: &ConnectionConfig) -> String {
        "fake://".into()
    }
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn company_catalog() -> FakeCatalog {
    FakeCatalog {
        tables: names(&["audit_log", "departments", "employees"]),
        columns: vec![
            ColumnSpec::new("departments", "id", "integer", 1).not_null(),
            ColumnSpec::new("departments", "name", "character varying", 2).with_char_max_len(100),
            // Deliberately out of ordinal order
            ColumnSpec::new("employees", "department_id", "integer", 3),
            ColumnSpec::new("employees", "id", "integer", 1)
                .not_null()
                .with_default("nextval('employees_id_seq'::regclass)"),
            ColumnSpec::new("employees", "name", "text", 2).not_null(),
            ColumnSpec::new("audit_log", "id", "bigint", 1).not_null(),
        ],
        primary_keys: vec![
            PrimaryKeySpec {
                table: "departments".into(),
                columns: names(&["id"]),
            },
            PrimaryKeySpec {
                table: "employees".into(),
                columns: names(&["id"]),
            },
        ],
        foreign_keys: vec![ForeignKeySpec {
            table: "employees".into(),
            column: "department_id".into(),
            ref_table: "departments".into(),
            ref_column: "id".into(),
        }],
        fail_columns: false,
        log: Arc::new(CallLog::default()),
    }
}

fn config() -> ConnectionConfig {
    ConnectionConfig::new("fake", "localhost", 5432, "agent_db")
}

fn driver(catalog: FakeCatalog) -> FakeDriver {
    FakeDriver {
        catalog,
        refuse_connections: false,
    }
}

#[tokio::test]
async fn test_read_schema_for_target_tables() {
    let catalog = company_catalog();
    let log = Arc::clone(&catalog.log);
    let selection = TableSelection::Only(names(&["employees", "departments"]));

    let snapshot = read_schema(&driver(catalog), &config(), &selection)
        .await
        .unwrap();

    assert_eq!(snapshot.table_names(), vec!["employees", "departments"]);
    assert_eq!(snapshot.discovered, names(&["audit_log", "departments", "employees"]));

    let employees = snapshot.table("employees").unwrap();
    let column_names: Vec<&str> = employees.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(column_names, vec!["id", "name", "department_id"]);
    assert_eq!(employees.primary_key.as_ref().unwrap().columns, names(&["id"]));
    assert_eq!(employees.foreign_keys.len(), 1);
    assert!(snapshot.table("audit_log").is_none());

    assert_eq!(CallLog::count(&log.list_tables), 1);
    assert_eq!(log.metadata_queries(), 3);
    assert_eq!(CallLog::count(&log.commits), 1);
    assert_eq!(CallLog::count(&log.closes), 1);
}

#[tokio::test]
async fn test_round_trips_do_not_grow_with_table_count() {
    let mut catalog = company_catalog();
    for i in 0..50 {
        let table = format!("extra_{i:02}");
        catalog.columns.push(ColumnSpec::new(&table, "id", "integer", 1));
        catalog.tables.push(table);
    }
    let log = Arc::clone(&catalog.log);

    let snapshot = read_schema(&driver(catalog), &config(), &TableSelection::All)
        .await
        .unwrap();

    assert_eq!(snapshot.tables.len(), 53);
    assert_eq!(log.metadata_queries(), 3);
}

#[tokio::test]
async fn test_all_tables_follow_discovery_order() {
    let snapshot = read_schema(&driver(company_catalog()), &config(), &TableSelection::All)
        .await
        .unwrap();
    assert_eq!(snapshot.table_names(), vec!["audit_log", "departments", "employees"]);
}

#[tokio::test]
async fn test_ghost_table_is_target_tables_not_found() {
    let mut catalog = company_catalog();
    catalog.tables = names(&["employees"]);
    let log = Arc::clone(&catalog.log);
    let selection = TableSelection::Only(names(&["ghost_table"]));

    let err = read_schema(&driver(catalog), &config(), &selection)
        .await
        .unwrap_err();

    match err {
        CatalogError::TargetTablesNotFound { requested, .. } => {
            assert_eq!(requested, names(&["ghost_table"]))
        }
        other => panic!("expected TargetTablesNotFound, got {other:?}"),
    }
    assert_eq!(log.metadata_queries(), 0);
    assert_eq!(CallLog::count(&log.rollbacks), 1);
    assert_eq!(CallLog::count(&log.closes), 1);
}

#[tokio::test]
async fn test_empty_schema_is_no_tables_found() {
    let mut catalog = company_catalog();
    catalog.tables.clear();

    let err = read_schema(&driver(catalog), &config(), &TableSelection::All)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::NoTablesFound { ref schema } if schema == "public"));
    assert_eq!(err.marker(), "-- No tables found in public schema --");
}

#[tokio::test]
async fn test_mid_read_failure_releases_connection() {
    let mut catalog = company_catalog();
    catalog.fail_columns = true;
    let log = Arc::clone(&catalog.log);

    let err = read_schema(&driver(catalog), &config(), &TableSelection::All)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::ConnectionFailed { .. }));
    assert_eq!(CallLog::count(&log.primary_keys), 0);
    assert_eq!(CallLog::count(&log.commits), 0);
    assert_eq!(CallLog::count(&log.rollbacks), 1);
    assert_eq!(CallLog::count(&log.closes), 1);
}

#[tokio::test]
async fn test_refused_connection_is_connection_failed() {
    let catalog = company_catalog();
    let log = Arc::clone(&catalog.log);
    let driver = FakeDriver {
        catalog,
        refuse_connections: true,
    };

    let err = read_schema(&driver, &config(), &TableSelection::All)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::ConnectionFailed { .. }));
    assert!(err.marker().starts_with("-- Schema retrieval failed:"));
    assert_eq!(CallLog::count(&log.list_tables), 0);
}

#[tokio::test]
async fn test_connection_without_catalog_support() {
    let conn = FakeConnection {
        catalog: None,
        log: Arc::new(CallLog::default()),
        closed: AtomicBool::new(false),
    };

    let err = read_snapshot(&conn, "public", &TableSelection::All)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::ConnectionFailed {
            cause: ScribeError::NotSupported(_)
        }
    ));
}

#[test]
fn test_assemble_drops_rows_outside_effective_set() {
    let catalog = company_catalog();
    let snapshot = assemble_snapshot(
        SchemaSnapshot::new("public", TableSelection::All, catalog.tables.clone()),
        &names(&["departments"]),
        catalog.columns.clone(),
        catalog.primary_keys.clone(),
        catalog.foreign_keys.clone(),
    );

    assert_eq!(snapshot.table_names(), vec!["departments"]);
    let departments = snapshot.table("departments").unwrap();
    assert_eq!(departments.columns.len(), 2);
    assert!(departments.foreign_keys.is_empty());
}
