//! Tests for CREATE TABLE synthesis

use super::*;
use indoc::indoc;
use pretty_assertions::assert_eq;
use sqlscribe_core::TableSelection;

fn snapshot(tables: Vec<TableSchema>) -> SchemaSnapshot {
    let names = tables.iter().map(|t| t.name.clone()).collect();
    let mut snapshot = SchemaSnapshot::new("public", TableSelection::All, names);
    snapshot.tables = tables;
    snapshot
}

fn departments() -> TableSchema {
    TableSchema {
        name: "departments".into(),
        columns: vec![
            ColumnSpec::new("departments", "id", "integer", 1)
                .not_null()
                .with_default("nextval('departments_id_seq'::regclass)"),
            ColumnSpec::new("departments", "name", "character varying", 2)
                .not_null()
                .with_char_max_len(100),
        ],
        primary_key: Some(PrimaryKeySpec {
            table: "departments".into(),
            columns: vec!["id".into()],
        }),
        foreign_keys: vec![],
    }
}

fn employees() -> TableSchema {
    TableSchema {
        name: "employees".into(),
        columns: vec![
            ColumnSpec::new("employees", "id", "integer", 1)
                .not_null()
                .with_default("nextval('employees_id_seq'::regclass)"),
            ColumnSpec::new("employees", "name", "text", 2).not_null(),
            ColumnSpec::new("employees", "salary", "numeric", 3).with_precision(10, Some(2)),
            ColumnSpec::new("employees", "active", "boolean", 4).with_default("true"),
            ColumnSpec::new("employees", "department_id", "integer", 5),
        ],
        primary_key: Some(PrimaryKeySpec {
            table: "employees".into(),
            columns: vec!["id".into()],
        }),
        foreign_keys: vec![ForeignKeySpec {
            table: "employees".into(),
            column: "department_id".into(),
            ref_table: "departments".into(),
            ref_column: "id".into(),
        }],
    }
}

#[test]
fn test_synthesize_full_statements() {
    let ddl = synthesize(&snapshot(vec![employees(), departments()]));

    let expected = indoc! {r#"
        CREATE TABLE public."employees" (
            "id" INTEGER NOT NULL,
            "name" TEXT NOT NULL,
            "salary" NUMERIC(10,2),
            "active" BOOLEAN DEFAULT true,
            "department_id" INTEGER,
            PRIMARY KEY ("id"),
            FOREIGN KEY ("department_id") REFERENCES public."departments" ("id")
        );

        CREATE TABLE public."departments" (
            "id" INTEGER NOT NULL,
            "name" CHARACTER VARYING(100) NOT NULL,
            PRIMARY KEY ("id")
        );"#};
    assert_eq!(ddl, expected);
}

#[test]
fn test_synthesize_is_deterministic() {
    let snap = snapshot(vec![employees(), departments()]);
    assert_eq!(synthesize(&snap), synthesize(&snap));
}

#[test]
fn test_one_statement_per_table_with_columns() {
    let empty = TableSchema::new("no_columns");
    let ddl = synthesize(&snapshot(vec![employees(), empty, departments()]));

    assert_eq!(ddl.matches("CREATE TABLE").count(), 2);
    assert_eq!(ddl.split("\n\n").count(), 2);
    assert!(ddl.split("\n\n").all(|stmt| stmt.ends_with(");")));
    assert!(!ddl.contains("no_columns"));
}

#[test]
fn test_composite_primary_key_keeps_order() {
    let table = TableSchema {
        name: "assignments".into(),
        columns: vec![
            ColumnSpec::new("assignments", "a", "integer", 1).not_null(),
            ColumnSpec::new("assignments", "b", "integer", 2).not_null(),
        ],
        primary_key: Some(PrimaryKeySpec {
            table: "assignments".into(),
            columns: vec!["a".into(), "b".into()],
        }),
        foreign_keys: vec![],
    };
    let ddl = synthesize(&snapshot(vec![table]));
    assert!(ddl.contains("PRIMARY KEY (\"a\", \"b\")"), "{ddl}");
}

#[test]
fn test_varchar_length_suffix() {
    let table = TableSchema {
        name: "users".into(),
        columns: vec![ColumnSpec::new("users", "col", "varchar", 1).with_char_max_len(255)],
        ..Default::default()
    };
    let ddl = synthesize(&snapshot(vec![table]));
    assert!(ddl.contains("\"col\" VARCHAR(255)"), "{ddl}");
}

#[test]
fn test_numeric_without_scale_and_without_precision() {
    let table = TableSchema {
        name: "prices".into(),
        columns: vec![
            ColumnSpec::new("prices", "whole", "numeric", 1).with_precision(12, None),
            ColumnSpec::new("prices", "any", "numeric", 2),
            // precision on non-numeric types is ignored
            ColumnSpec::new("prices", "qty", "integer", 3).with_precision(32, Some(0)),
        ],
        ..Default::default()
    };
    let ddl = synthesize(&snapshot(vec![table]));
    assert!(ddl.contains("\"whole\" NUMERIC(12),"), "{ddl}");
    assert!(ddl.contains("\"any\" NUMERIC,"), "{ddl}");
    assert!(ddl.contains("\"qty\" INTEGER\n"), "{ddl}");
}

#[test]
fn test_sequence_default_is_stripped() {
    let ddl = synthesize(&snapshot(vec![departments()]));
    assert!(!ddl.contains("DEFAULT"), "{ddl}");
    assert!(!ddl.contains("nextval"), "{ddl}");
}

#[test]
fn test_sequence_default_kept_when_configured() {
    let synthesizer = DdlSynthesizer::new(SequenceDefaultPolicy::Keep);
    let ddl = synthesizer.synthesize(&snapshot(vec![departments()]));
    assert!(
        ddl.contains("\"id\" INTEGER NOT NULL DEFAULT nextval('departments_id_seq'::regclass)"),
        "{ddl}"
    );
}

#[test]
fn test_columns_rendered_in_ordinal_order() {
    let mut table = employees();
    table.columns.reverse();
    let ddl = synthesize(&snapshot(vec![table]));
    let id = ddl.find("\"id\" INTEGER").unwrap();
    let dept = ddl.find("\"department_id\" INTEGER").unwrap();
    assert!(id < dept);
}

#[test]
fn test_no_emittable_tables_returns_failure_marker() {
    let ddl = synthesize(&snapshot(vec![TableSchema::new("ghost"), TableSchema::new("shadow")]));
    assert_eq!(ddl, "-- Schema reconstruction failed for tables: [ghost, shadow] --");
    assert!(is_reconstruction_failure(&ddl));
}

#[test]
fn test_identifiers_with_quotes_are_escaped() {
    let table = TableSchema {
        name: "odd\"name".into(),
        columns: vec![ColumnSpec::new("odd\"name", "x", "text", 1)],
        ..Default::default()
    };
    let mut snap = snapshot(vec![table]);
    snap.schema = "Sales".into();
    let ddl = synthesize(&snap);
    assert!(ddl.starts_with("CREATE TABLE \"Sales\".\"odd\"\"name\" ("), "{ddl}");
}
