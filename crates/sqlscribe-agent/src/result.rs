//! Classification of the agent's final answer

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One result row keyed by column name
pub type TabularRow = BTreeMap<String, String>;

/// The agent's answer, decided once where the response enters the program
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResult {
    /// Prose answer
    Text(String),
    /// Rows from a select. `headers` is `None` when the response carried none.
    Tabular {
        headers: Option<Vec<String>>,
        rows: Vec<TabularRow>,
    },
    /// A statement that succeeded without returning rows
    Status { message: String },
    ToolError { message: String },
    /// Anything that fits none of the above, kept verbatim
    Unknown(Value),
}

impl AgentResult {
    /// Classify raw model output. JSON objects (optionally inside a markdown
    /// code fence) go through [`AgentResult::classify`]; anything else is text.
    pub fn from_content(content: &str) -> Self {
        let trimmed = content.trim();
        match serde_json::from_str::<Value>(strip_code_fence(trimmed)) {
            Ok(value @ Value::Object(_)) => Self::classify(value),
            _ => AgentResult::Text(trimmed.to_string()),
        }
    }

    pub fn classify(raw: Value) -> Self {
        let map = match &raw {
            Value::Object(map) => map,
            Value::String(text) => return AgentResult::Text(text.clone()),
            _ => return AgentResult::Unknown(raw.clone()),
        };

        let decided = match map.get("status").and_then(Value::as_str) {
            None => map.get("output").map(unwrap_output),
            Some("error") => Some(AgentResult::ToolError {
                message: string_field(map, "message").unwrap_or("No message.").to_string(),
            }),
            Some("success") => classify_success(map),
            Some(_) => None,
        };

        decided.unwrap_or(AgentResult::Unknown(raw))
    }
}

/// `{"output": ...}` envelopes wrap the real answer, sometimes as a JSON string
fn unwrap_output(inner: &Value) -> AgentResult {
    match inner {
        Value::String(text) => AgentResult::from_content(text),
        other => AgentResult::classify(other.clone()),
    }
}

fn classify_success(map: &Map<String, Value>) -> Option<AgentResult> {
    if string_field(map, "type") != Some("select") {
        let message = string_field(map, "message").unwrap_or("Statement executed successfully.");
        return Some(AgentResult::Status {
            message: message.to_string(),
        });
    }

    let rows = match map.get("data") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_object().map(row_cells))
            .collect::<Option<Vec<_>>>()?,
        Some(_) => return None,
    };

    let headers = match map.get("headers") {
        Some(Value::Array(names)) if !names.is_empty() => {
            Some(names.iter().map(cell_text).collect())
        }
        _ => None,
    };

    Some(AgentResult::Tabular { headers, rows })
}

fn row_cells(object: &Map<String, Value>) -> TabularRow {
    object
        .iter()
        .map(|(key, value)| (key.clone(), cell_text(value)))
        .collect()
}

/// Display text of one cell. Strings lose their JSON quotes, `null` reads as NULL.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

fn string_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (`json`) on the opening fence line
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests;
