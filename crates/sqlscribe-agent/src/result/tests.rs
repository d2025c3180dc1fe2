//! Tests for agent result classification

use super::*;
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

fn row(cells: &[(&str, &str)]) -> TabularRow {
    cells
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_plain_text_is_text() {
    assert_eq!(
        AgentResult::from_content("  There are 12 employees.\n"),
        AgentResult::Text("There are 12 employees.".into())
    );
}

#[test]
fn test_json_scalars_are_not_structured() {
    assert_eq!(AgentResult::from_content("42"), AgentResult::Text("42".into()));
    assert_eq!(
        AgentResult::from_content("[1, 2]"),
        AgentResult::Text("[1, 2]".into())
    );
}

#[test]
fn test_select_with_headers() {
    let raw = json!({
        "status": "success",
        "type": "select",
        "headers": ["id", "name"],
        "data": [{"id": 1, "name": "Ann"}, {"id": 2, "name": null}]
    });
    assert_eq!(
        AgentResult::classify(raw),
        AgentResult::Tabular {
            headers: Some(vec!["id".into(), "name".into()]),
            rows: vec![
                row(&[("id", "1"), ("name", "Ann")]),
                row(&[("id", "2"), ("name", "NULL")]),
            ],
        }
    );
}

#[test]
fn test_select_without_headers() {
    let raw = json!({"status": "success", "type": "select", "data": [{"id": 1}]});
    assert_eq!(
        AgentResult::classify(raw),
        AgentResult::Tabular {
            headers: None,
            rows: vec![row(&[("id", "1")])],
        }
    );
}

#[test]
fn test_select_with_empty_data() {
    let raw = json!({"status": "success", "type": "select", "headers": ["id"], "data": []});
    assert_eq!(
        AgentResult::classify(raw),
        AgentResult::Tabular {
            headers: Some(vec!["id".into()]),
            rows: vec![],
        }
    );
}

#[test]
fn test_select_with_malformed_rows_is_unknown() {
    let raw = json!({"status": "success", "type": "select", "data": [[1, "Ann"]]});
    assert_eq!(AgentResult::classify(raw.clone()), AgentResult::Unknown(raw));
}

#[test]
fn test_success_without_select_is_status() {
    let raw = json!({"status": "success", "type": "command", "message": "0 rows affected"});
    assert_eq!(
        AgentResult::classify(raw),
        AgentResult::Status {
            message: "0 rows affected".into()
        }
    );
}

#[test]
fn test_error_status() {
    assert_eq!(
        AgentResult::classify(json!({"status": "error", "message": "relation \"x\" does not exist"})),
        AgentResult::ToolError {
            message: "relation \"x\" does not exist".into()
        }
    );
    assert_eq!(
        AgentResult::classify(json!({"status": "error"})),
        AgentResult::ToolError {
            message: "No message.".into()
        }
    );
}

#[test]
fn test_unrecognized_status_is_unknown() {
    let raw = json!({"status": "pending", "message": "still running"});
    assert_eq!(AgentResult::classify(raw.clone()), AgentResult::Unknown(raw));
}

#[test]
fn test_object_without_status_or_output_is_unknown() {
    let raw = json!({"answer": 42});
    assert_eq!(AgentResult::classify(raw.clone()), AgentResult::Unknown(raw));
}

#[test]
fn test_output_envelope_is_unwrapped() {
    let raw = json!({"output": {"status": "error", "message": "boom"}});
    assert_eq!(
        AgentResult::classify(raw),
        AgentResult::ToolError {
            message: "boom".into()
        }
    );

    let raw = json!({"output": "Three departments."});
    assert_eq!(
        AgentResult::classify(raw),
        AgentResult::Text("Three departments.".into())
    );
}

#[test]
fn test_output_envelope_holding_json_text() {
    let raw = json!({"output": "{\"status\": \"success\", \"type\": \"select\", \"headers\": [\"n\"], \"data\": [{\"n\": 3}]}"});
    assert_eq!(
        AgentResult::classify(raw),
        AgentResult::Tabular {
            headers: Some(vec!["n".into()]),
            rows: vec![row(&[("n", "3")])],
        }
    );
}

#[test]
fn test_fenced_json_is_classified() {
    let content = indoc! {r#"
        ```json
        {"status": "success", "type": "select", "headers": ["id"], "data": []}
        ```
    "#};
    assert_eq!(
        AgentResult::from_content(content),
        AgentResult::Tabular {
            headers: Some(vec!["id".into()]),
            rows: vec![],
        }
    );
}

#[test]
fn test_non_object_values_never_fail() {
    assert_eq!(AgentResult::classify(json!(null)), AgentResult::Unknown(json!(null)));
    assert_eq!(AgentResult::classify(json!([1, 2])), AgentResult::Unknown(json!([1, 2])));
    assert_eq!(AgentResult::classify(json!("hi")), AgentResult::Text("hi".into()));
}
