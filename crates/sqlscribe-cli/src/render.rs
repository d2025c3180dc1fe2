//! Console rendering of agent results

use comfy_table::{Table, presets::UTF8_FULL};
use sqlscribe_agent::{AgentError, AgentResult, TabularRow};

pub const NO_ROWS_NOTICE: &str = "Query OK, 0 rows returned.";
pub const MISSING_HEADERS_WARNING: &str = "Warn: Select OK but headers missing.";
pub const TABLE_TITLE: &str = "Query Results";

/// Text ready to print, always newline-terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput(String);

impl RenderedOutput {
    fn new(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn render(result: &AgentResult) -> RenderedOutput {
    match result {
        AgentResult::Text(text) => RenderedOutput::new(format!("Agent Answer:\n{text}")),
        AgentResult::Tabular { rows, .. } if rows.is_empty() => RenderedOutput::new(NO_ROWS_NOTICE),
        AgentResult::Tabular {
            headers: Some(headers),
            rows,
        } => RenderedOutput::new(format!("{TABLE_TITLE}\n{}", results_table(headers, rows))),
        AgentResult::Tabular { headers: None, rows } => {
            let dump = serde_json::to_string_pretty(rows).unwrap_or_else(|_| format!("{rows:?}"));
            RenderedOutput::new(format!("{MISSING_HEADERS_WARNING}\n{dump}"))
        }
        AgentResult::Status { message } => RenderedOutput::new(format!("Status: {message}")),
        AgentResult::ToolError { message } => RenderedOutput::new(format!("Error: {message}")),
        AgentResult::Unknown(raw) => RenderedOutput::new(format!("Agent Response (Raw): {raw}")),
    }
}

pub fn render_error(error: &AgentError) -> RenderedOutput {
    RenderedOutput::new(format!("Error: {}", error.user_message()))
}

fn results_table(headers: &[String], rows: &[TabularRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(headers.iter());
    for row in rows {
        table.add_row(
            headers
                .iter()
                .map(|header| row.get(header).map(String::as_str).unwrap_or("")),
        );
    }
    table
}
