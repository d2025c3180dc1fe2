//! Batched information_schema reads for PostgreSQL
//!
//! Every lookup covers the whole table set with `= ANY($2)`, so a snapshot of
//! any size costs the same number of round-trips.

use async_trait::async_trait;
use sqlscribe_core::{
    CatalogIntrospection, ColumnSpec, Connection, ForeignKeySpec, PrimaryKeySpec, Result, Row,
    Value,
};

use crate::PostgresConnection;

pub const TABLES_SQL: &str = "\
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema::text = $1
  AND table_type = 'BASE TABLE'
ORDER BY table_name";

pub const COLUMNS_SQL: &str = "\
SELECT table_name::text,
       column_name::text,
       data_type::text,
       is_nullable::text,
       column_default::text,
       character_maximum_length::int4,
       numeric_precision::int4,
       numeric_scale::int4,
       ordinal_position::int4
FROM information_schema.columns
WHERE table_schema::text = $1
  AND table_name::text = ANY($2)
ORDER BY table_name, ordinal_position";

pub const PRIMARY_KEYS_SQL: &str = "\
SELECT tc.table_name::text, kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.table_schema = tc.table_schema
 AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
  AND tc.table_schema::text = $1
  AND tc.table_name::text = ANY($2)
ORDER BY tc.table_name, kcu.ordinal_position";

/// Pairs each referencing column with the referenced column at the same key
/// position, so composite foreign keys do not fan out.
pub const FOREIGN_KEYS_SQL: &str = "\
SELECT kcu.table_name::text,
       kcu.column_name::text,
       ref.table_name::text,
       ref.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.constraint_schema = tc.constraint_schema
JOIN information_schema.referential_constraints rc
  ON rc.constraint_name = tc.constraint_name
 AND rc.constraint_schema = tc.constraint_schema
JOIN information_schema.key_column_usage ref
  ON ref.constraint_name = rc.unique_constraint_name
 AND ref.constraint_schema = rc.unique_constraint_schema
 AND ref.ordinal_position = kcu.position_in_unique_constraint
WHERE tc.constraint_type = 'FOREIGN KEY'
  AND tc.table_schema::text = $1
  AND tc.table_name::text = ANY($2)
ORDER BY kcu.table_name, tc.constraint_name, kcu.ordinal_position";

fn text(row: &Row, idx: usize) -> String {
    row.get(idx)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn optional_text(row: &Row, idx: usize) -> Option<String> {
    row.get(idx).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn optional_int(row: &Row, idx: usize) -> Option<i32> {
    row.get(idx)
        .and_then(|v| v.as_i64())
        .and_then(|v| i32::try_from(v).ok())
}

fn batch_params(schema: &str, tables: &[String]) -> [Value; 2] {
    [
        Value::String(schema.to_string()),
        Value::Array(tables.iter().cloned().map(Value::String).collect()),
    ]
}

pub(crate) fn column_from_row(row: &Row) -> ColumnSpec {
    ColumnSpec {
        table: text(row, 0),
        name: text(row, 1),
        data_type: text(row, 2),
        nullable: text(row, 3).eq_ignore_ascii_case("YES"),
        default: optional_text(row, 4),
        char_max_len: optional_int(row, 5),
        numeric_precision: optional_int(row, 6),
        numeric_scale: optional_int(row, 7),
        ordinal: optional_int(row, 8).unwrap_or_default(),
    }
}

/// Fold (table, column) rows into one key per table, keeping row order
pub(crate) fn group_primary_keys(rows: &[Row]) -> Vec<PrimaryKeySpec> {
    let mut keys: Vec<PrimaryKeySpec> = Vec::new();
    for row in rows {
        let table = text(row, 0);
        let column = text(row, 1);
        match keys.last_mut() {
            Some(key) if key.table == table => key.columns.push(column),
            _ => keys.push(PrimaryKeySpec {
                table,
                columns: vec![column],
            }),
        }
    }
    keys
}

pub(crate) fn foreign_key_from_row(row: &Row) -> ForeignKeySpec {
    ForeignKeySpec {
        table: text(row, 0),
        column: text(row, 1),
        ref_table: text(row, 2),
        ref_column: text(row, 3),
    }
}

#[async_trait]
impl CatalogIntrospection for PostgresConnection {
    #[tracing::instrument(skip(self))]
    async fn list_base_tables(&self, schema: &str) -> Result<Vec<String>> {
        let result = self
            .query(TABLES_SQL, &[Value::String(schema.to_string())])
            .await?;
        Ok(result.rows.iter().map(|row| text(row, 0)).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns_batch(&self, schema: &str, tables: &[String]) -> Result<Vec<ColumnSpec>> {
        let result = self.query(COLUMNS_SQL, &batch_params(schema, tables)).await?;
        Ok(result.rows.iter().map(column_from_row).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_primary_keys_batch(
        &self,
        schema: &str,
        tables: &[String],
    ) -> Result<Vec<PrimaryKeySpec>> {
        let result = self
            .query(PRIMARY_KEYS_SQL, &batch_params(schema, tables))
            .await?;
        Ok(group_primary_keys(&result.rows))
    }

    #[tracing::instrument(skip(self))]
    async fn get_foreign_keys_batch(
        &self,
        schema: &str,
        tables: &[String],
    ) -> Result<Vec<ForeignKeySpec>> {
        let result = self
            .query(FOREIGN_KEYS_SQL, &batch_params(schema, tables))
            .await?;
        Ok(result.rows.iter().map(foreign_key_from_row).collect())
    }
}
