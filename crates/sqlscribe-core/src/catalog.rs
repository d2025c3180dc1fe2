//! Catalog introspection trait and the typed catalog data model

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Batched reads against an information-schema style catalog.
///
/// Each `*_batch` method answers for a whole set of tables in a single round-trip.
#[async_trait]
pub trait CatalogIntrospection: Send + Sync {
    /// List base tables (no views) in a schema, sorted by name
    async fn list_base_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// Columns of the given tables, ordered by table then ordinal position
    async fn get_columns_batch(&self, schema: &str, tables: &[String]) -> Result<Vec<ColumnSpec>>;

    /// Primary keys of the given tables, key columns in constraint order
    async fn get_primary_keys_batch(
        &self,
        schema: &str,
        tables: &[String],
    ) -> Result<Vec<PrimaryKeySpec>>;

    /// Foreign key column pairs of the given tables
    async fn get_foreign_keys_batch(
        &self,
        schema: &str,
        tables: &[String],
    ) -> Result<Vec<ForeignKeySpec>>;

    /// Columns of a single table
    async fn describe_table(&self, schema: &str, table: &str) -> Result<Vec<ColumnSpec>> {
        self.get_columns_batch(schema, &[table.to_string()]).await
    }
}

/// One column as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub char_max_len: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    /// 1-based position within the table
    pub ordinal: i32,
}

impl ColumnSpec {
    pub fn new(table: &str, name: &str, data_type: &str, ordinal: i32) -> Self {
        Self {
            table: table.to_string(),
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            default: None,
            char_max_len: None,
            numeric_precision: None,
            numeric_scale: None,
            ordinal,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_char_max_len(mut self, len: i32) -> Self {
        self.char_max_len = Some(len);
        self
    }

    pub fn with_precision(mut self, precision: i32, scale: Option<i32>) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = scale;
        self
    }
}

/// Primary key of one table. Composite keys keep their constraint column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeySpec {
    pub table: String,
    pub columns: Vec<String>,
}

/// One referencing column of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    pub table: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

/// Everything known about one table; the unit turned into one `CREATE TABLE`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Option<PrimaryKeySpec>,
    pub foreign_keys: Vec<ForeignKeySpec>,
}

impl TableSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Which tables a schema read should cover
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableSelection {
    /// Every base table in the schema
    #[default]
    All,
    /// Only the named tables, in this order
    Only(Vec<String>),
}

impl TableSelection {
    /// Build a selection from names, dropping blanks and duplicates.
    /// An empty list selects every table.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !unique.iter().any(|existing| existing == name) {
                unique.push(name.to_string());
            }
        }
        if unique.is_empty() {
            TableSelection::All
        } else {
            TableSelection::Only(unique)
        }
    }

    /// Resolve against the discovered tables.
    ///
    /// `All` keeps the discovered order; `Only` keeps the requested order and
    /// drops names the catalog does not have.
    pub fn resolve(&self, discovered: &[String]) -> Vec<String> {
        match self {
            TableSelection::All => discovered.to_vec(),
            TableSelection::Only(requested) => requested
                .iter()
                .filter(|name| discovered.contains(name))
                .cloned()
                .collect(),
        }
    }

    pub fn requested(&self) -> Option<&[String]> {
        match self {
            TableSelection::All => None,
            TableSelection::Only(names) => Some(names),
        }
    }
}

/// A point-in-time view of part of one schema, built fresh for each read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub schema: String,
    pub selection: TableSelection,
    /// Base tables the catalog reported, before selection
    pub discovered: Vec<String>,
    /// Tables in effective order
    pub tables: Vec<TableSchema>,
}

impl SchemaSnapshot {
    pub fn new(schema: &str, selection: TableSelection, discovered: Vec<String>) -> Self {
        Self {
            schema: schema.to_string(),
            selection,
            discovered,
            tables: Vec::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}
