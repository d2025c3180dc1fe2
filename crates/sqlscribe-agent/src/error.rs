use sqlscribe_core::ScribeError;
use thiserror::Error;

/// Failure to construct the agent; fatal at startup
#[derive(Debug, Error)]
pub enum AgentSetupError {
    #[error("missing credential: {0} must be set")]
    MissingCredential(&'static str),

    #[error("invalid agent settings: {0}")]
    InvalidSettings(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure of a single agent invocation; the caller reports it and moves on
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The endpoint refused the tool definitions or returned a tool call we cannot run
    #[error("tool contract violation: {0}")]
    ToolContract(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no final answer after {0} tool rounds")]
    ToolRoundsExhausted(usize),

    #[error("database error: {0}")]
    Database(#[from] ScribeError),
}

impl AgentError {
    /// Message for the console, with a next step where one exists
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Authentication(_) => {
                format!("{self}. Check that OPENAI_API_KEY is valid for the configured endpoint.")
            }
            AgentError::RateLimited(_) => format!("{self}. Wait a moment and try again."),
            AgentError::ToolContract(_) => format!(
                "{self}. The configured model may not support function calling; \
                 pick a tool-capable model with --model or SQLSCRIBE_MODEL."
            ),
            AgentError::ToolRoundsExhausted(_) => format!(
                "{self}. Try a more specific question or raise --max-tool-rounds."
            ),
            _ => self.to_string(),
        }
    }
}
