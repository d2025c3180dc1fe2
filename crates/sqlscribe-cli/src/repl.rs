//! Interactive read-eval-print loop

use sqlscribe_agent::QueryAgent;
use std::future::Future;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::render::{render, render_error};

pub const PROMPT: &str = "> ";
const SCHEMA_FOOTER: &str = "----------------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Schema,
    Empty,
    Query(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Command::Empty
        } else if trimmed.eq_ignore_ascii_case("quit") {
            Command::Quit
        } else if trimmed.eq_ignore_ascii_case("schema") {
            Command::Schema
        } else {
            Command::Query(trimmed.to_string())
        }
    }
}

/// The schema view computed once at startup
#[derive(Debug, Clone)]
pub struct SchemaView {
    /// Names shown in the header, e.g. `employees, departments`
    pub tables_label: String,
    pub text: String,
}

impl SchemaView {
    fn write_to(&self, output: &mut impl Write) -> io::Result<()> {
        writeln!(output, "\n--- Database Schema ({}) ---", self.tables_label)?;
        writeln!(output, "{}", self.text)?;
        writeln!(output, "{SCHEMA_FOOTER}\n")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub agent_calls: usize,
    pub agent_failures: usize,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    EndOfInput,
    Interrupted,
}

/// Read commands until `quit`, end of input or `shutdown` resolves.
/// An agent call still in flight when `shutdown` resolves is abandoned.
///
/// Agent failures are rendered and the loop continues; only I/O errors on
/// the console itself end it early.
pub async fn run_loop<R, W, S>(
    input: R,
    output: &mut W,
    schema: &SchemaView,
    agent: &dyn QueryAgent,
    shutdown: S,
) -> io::Result<(ExitReason, LoopStats)>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut lines = input.lines();
    let mut stats = LoopStats::default();

    writeln!(output, "\n--- SQL Agent Ready ---")?;
    writeln!(output, "Enter query ('schema' to view, 'quit' to exit).")?;

    let reason = loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let line = tokio::select! {
            _ = &mut shutdown => {
                writeln!(output)?;
                break ExitReason::Interrupted;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break ExitReason::EndOfInput;
        };

        match Command::parse(&line) {
            Command::Quit => break ExitReason::Quit,
            Command::Empty => {}
            Command::Schema => schema.write_to(output)?,
            Command::Query(instruction) => {
                tracing::info!(instruction = %instruction, "running agent");
                stats.agent_calls += 1;
                let outcome = tokio::select! {
                    _ = &mut shutdown => {
                        tracing::warn!("interrupted while the agent was running");
                        writeln!(output)?;
                        break ExitReason::Interrupted;
                    }
                    outcome = agent.run(&instruction) => outcome,
                };
                let rendered = match outcome {
                    Ok(result) => render(&result),
                    Err(e) => {
                        stats.agent_failures += 1;
                        tracing::error!(error = %e, "agent invocation failed");
                        render_error(&e)
                    }
                };
                output.write_all(rendered.as_str().as_bytes())?;
            }
        }
    };

    tracing::debug!(?reason, "interactive loop finished");
    Ok((reason, stats))
}
