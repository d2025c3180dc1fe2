//! CREATE TABLE synthesis from a schema snapshot

use sqlscribe_core::{ColumnSpec, ForeignKeySpec, PrimaryKeySpec, SchemaSnapshot, TableSchema};

/// Prefix of the marker returned when no table in a snapshot could be rendered
pub const RECONSTRUCTION_FAILED_PREFIX: &str = "-- Schema reconstruction failed";

const INDENT: &str = "    ";

/// What to do with column defaults that draw from a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceDefaultPolicy {
    /// Drop `nextval(...)` defaults; they name sequences the reader never sees
    #[default]
    Strip,
    /// Reproduce the default expression verbatim
    Keep,
}

impl SequenceDefaultPolicy {
    fn keeps(&self, default: &str) -> bool {
        match self {
            SequenceDefaultPolicy::Keep => true,
            // Substring match, so a string literal mentioning nextval is dropped too
            SequenceDefaultPolicy::Strip => !default.contains("nextval"),
        }
    }
}

/// Renders snapshots as PostgreSQL `CREATE TABLE` statements
#[derive(Debug, Clone, Default)]
pub struct DdlSynthesizer {
    sequence_defaults: SequenceDefaultPolicy,
}

impl DdlSynthesizer {
    pub fn new(sequence_defaults: SequenceDefaultPolicy) -> Self {
        Self { sequence_defaults }
    }

    /// Render every table with at least one column, separated by a blank line.
    ///
    /// Returns a reconstruction-failed marker instead of an empty string when no
    /// table has columns.
    pub fn synthesize(&self, snapshot: &SchemaSnapshot) -> String {
        let statements: Vec<String> = snapshot
            .tables
            .iter()
            .filter_map(|table| self.create_table(&snapshot.schema, table))
            .collect();

        if statements.is_empty() {
            let names = snapshot.table_names().join(", ");
            tracing::warn!(tables = %names, "no table in the snapshot had columns to render");
            return format!("{} for tables: [{}] --", RECONSTRUCTION_FAILED_PREFIX, names);
        }

        tracing::debug!(statements = statements.len(), "synthesized schema DDL");
        statements.join("\n\n")
    }

    /// One `CREATE TABLE` statement, or `None` for a table without columns
    pub fn create_table(&self, schema: &str, table: &TableSchema) -> Option<String> {
        if table.columns.is_empty() {
            return None;
        }

        let mut clauses = TableClauses::default();
        let mut columns: Vec<&ColumnSpec> = table.columns.iter().collect();
        columns.sort_by_key(|c| c.ordinal);
        for column in columns {
            clauses.column(column, self.sequence_defaults);
        }
        if let Some(key) = &table.primary_key {
            clauses.primary_key(key);
        }
        for fk in &table.foreign_keys {
            clauses.foreign_key(schema, fk);
        }

        Some(clauses.finish(schema, &table.name))
    }
}

/// Shorthand for `DdlSynthesizer::default().synthesize(snapshot)`
pub fn synthesize(snapshot: &SchemaSnapshot) -> String {
    DdlSynthesizer::default().synthesize(snapshot)
}

/// True if `text` is the marker `synthesize` returns when nothing rendered
pub fn is_reconstruction_failure(text: &str) -> bool {
    text.starts_with(RECONSTRUCTION_FAILED_PREFIX)
}

/// Ordered clause buffer for one table body
#[derive(Default)]
struct TableClauses {
    lines: Vec<String>,
}

impl TableClauses {
    fn column(&mut self, column: &ColumnSpec, policy: SequenceDefaultPolicy) {
        let mut line = format!("{} {}", quote_ident(&column.name), column.data_type.to_uppercase());
        if let Some(suffix) = type_suffix(column) {
            line.push_str(&suffix);
        }
        if !column.nullable {
            line.push_str(" NOT NULL");
        }
        if let Some(default) = column.default.as_deref().filter(|d| policy.keeps(d)) {
            line.push_str(" DEFAULT ");
            line.push_str(default);
        }
        self.lines.push(line);
    }

    fn primary_key(&mut self, key: &PrimaryKeySpec) {
        if key.columns.is_empty() {
            return;
        }
        self.lines.push(format!("PRIMARY KEY ({})", quote_list(&key.columns)));
    }

    fn foreign_key(&mut self, schema: &str, fk: &ForeignKeySpec) {
        self.lines.push(format!(
            "FOREIGN KEY ({}) REFERENCES {}.{} ({})",
            quote_ident(&fk.column),
            schema_prefix(schema),
            quote_ident(&fk.ref_table),
            quote_ident(&fk.ref_column)
        ));
    }

    fn finish(self, schema: &str, table: &str) -> String {
        let body: Vec<String> = self
            .lines
            .into_iter()
            .map(|line| format!("{INDENT}{line}"))
            .collect();
        format!(
            "CREATE TABLE {}.{} (\n{}\n);",
            schema_prefix(schema),
            quote_ident(table),
            body.join(",\n")
        )
    }
}

/// Length or precision suffix for a column type
fn type_suffix(column: &ColumnSpec) -> Option<String> {
    if let Some(len) = column.char_max_len.filter(|len| *len > 0) {
        return Some(format!("({})", len));
    }
    let data_type = column.data_type.to_ascii_lowercase();
    if data_type == "numeric" || data_type == "decimal" {
        let precision = column.numeric_precision?;
        return Some(match column.numeric_scale {
            Some(scale) => format!("({},{})", precision, scale),
            None => format!("({})", precision),
        });
    }
    None
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lowercase simple identifiers stay bare (`public`); anything else is quoted
fn schema_prefix(schema: &str) -> String {
    let mut chars = schema.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if simple {
        schema.to_string()
    } else {
        quote_ident(schema)
    }
}

#[cfg(test)]
mod tests;
