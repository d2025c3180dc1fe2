//! Catalog reader: discovers tables and pulls their columns and keys

use sqlscribe_core::{
    CatalogIntrospection, ColumnSpec, Connection, ConnectionConfig, DatabaseDriver,
    ForeignKeySpec, PrimaryKeySpec, SchemaSnapshot, ScribeError, TableSchema, TableSelection,
};

use crate::CatalogError;

/// Read a schema snapshot over a fresh connection.
///
/// The connection is opened here and closed before returning on every path.
/// Failures are not retried.
#[tracing::instrument(skip(driver, config), fields(schema = %config.schema))]
pub async fn read_schema(
    driver: &dyn DatabaseDriver,
    config: &ConnectionConfig,
    selection: &TableSelection,
) -> Result<SchemaSnapshot, CatalogError> {
    let conn = driver.connect(config).await?;
    let outcome = read_snapshot(conn.as_ref(), &config.schema, selection).await;

    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "failed to close catalog connection");
    }

    outcome
}

/// Read a schema snapshot inside one read-only transaction on `conn`
pub async fn read_snapshot(
    conn: &dyn Connection,
    schema: &str,
    selection: &TableSelection,
) -> Result<SchemaSnapshot, CatalogError> {
    let catalog = conn.as_catalog().ok_or_else(|| {
        ScribeError::NotSupported(format!(
            "{} connections cannot introspect the catalog",
            conn.driver_name()
        ))
    })?;

    let tx = conn.begin_read_only().await?;
    let outcome = read_catalog(catalog, schema, selection).await;

    match &outcome {
        Ok(_) => tx.commit().await?,
        Err(_) => {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "failed to roll back catalog transaction");
            }
        }
    }

    outcome
}

async fn read_catalog(
    catalog: &dyn CatalogIntrospection,
    schema: &str,
    selection: &TableSelection,
) -> Result<SchemaSnapshot, CatalogError> {
    let discovered = catalog.list_base_tables(schema).await?;
    if discovered.is_empty() {
        tracing::warn!(schema = %schema, "no base tables found");
        return Err(CatalogError::NoTablesFound {
            schema: schema.to_string(),
        });
    }

    let effective = selection.resolve(&discovered);
    if effective.is_empty() {
        let requested = selection.requested().unwrap_or_default().to_vec();
        tracing::warn!(schema = %schema, ?requested, "none of the target tables exist");
        return Err(CatalogError::TargetTablesNotFound {
            schema: schema.to_string(),
            requested,
        });
    }

    tracing::info!(tables = ?effective, "fetching schema for tables");

    let columns = catalog.get_columns_batch(schema, &effective).await?;
    let primary_keys = catalog.get_primary_keys_batch(schema, &effective).await?;
    let foreign_keys = catalog.get_foreign_keys_batch(schema, &effective).await?;

    Ok(assemble_snapshot(
        SchemaSnapshot::new(schema, selection.clone(), discovered),
        &effective,
        columns,
        primary_keys,
        foreign_keys,
    ))
}

/// Group catalog rows into per-table schemas in `effective` order.
///
/// Rows for tables outside `effective` are dropped, and columns are sorted by
/// ordinal whatever order the catalog returned them in.
pub fn assemble_snapshot(
    mut snapshot: SchemaSnapshot,
    effective: &[String],
    columns: Vec<ColumnSpec>,
    primary_keys: Vec<PrimaryKeySpec>,
    foreign_keys: Vec<ForeignKeySpec>,
) -> SchemaSnapshot {
    let mut tables: Vec<TableSchema> =
        effective.iter().map(|name| TableSchema::new(name)).collect();

    for column in columns {
        if let Some(idx) = slot(&tables, &column.table) {
            tables[idx].columns.push(column);
        }
    }
    for key in primary_keys {
        if let Some(idx) = slot(&tables, &key.table) {
            tables[idx].primary_key = Some(key);
        }
    }
    for fk in foreign_keys {
        if let Some(idx) = slot(&tables, &fk.table) {
            tables[idx].foreign_keys.push(fk);
        }
    }
    for table in &mut tables {
        table.columns.sort_by_key(|c| c.ordinal);
    }

    snapshot.tables = tables;
    snapshot
}

fn slot(tables: &[TableSchema], name: &str) -> Option<usize> {
    tables.iter().position(|t| t.name == name)
}

#[cfg(test)]
mod tests;
