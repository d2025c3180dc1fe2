//! Query agent trait and settings

use async_trait::async_trait;
use std::time::Duration;

use crate::{AgentError, AgentResult, AgentSetupError};

pub const DEFAULT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Turns a natural-language instruction into an answer about the database
#[async_trait]
pub trait QueryAgent: Send + Sync {
    async fn run(&self, instruction: &str) -> Result<AgentResult, AgentError>;

    fn metadata(&self) -> AgentMetadata;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMetadata {
    pub name: String,
    pub model: String,
}

/// Settings for the OpenAI-backed agent
#[derive(Clone)]
pub struct AgentSettings {
    pub api_key: String,
    pub model: String,
    /// Base URL of an OpenAI-compatible API, without the trailing endpoint path
    pub base_url: String,
    pub temperature: f32,
    /// Chat round-trips allowed to end in tool calls before giving up
    pub max_tool_rounds: usize,
    /// Rows returned to the model per `run_sql_query` call
    pub max_result_rows: usize,
    pub request_timeout: Duration,
}

impl AgentSettings {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.0,
            max_tool_rounds: 8,
            max_result_rows: 200,
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn validate(&self) -> Result<(), AgentSetupError> {
        if self.api_key.trim().is_empty() {
            return Err(AgentSetupError::MissingCredential("OPENAI_API_KEY"));
        }
        if self.model.trim().is_empty() {
            return Err(AgentSetupError::InvalidSettings("model name is empty".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(AgentSetupError::InvalidSettings(format!(
                "base URL '{}' is not an http(s) URL",
                self.base_url
            )));
        }
        if self.max_tool_rounds == 0 {
            return Err(AgentSetupError::InvalidSettings(
                "max tool rounds must be at least 1".into(),
            ));
        }
        if self.max_result_rows == 0 {
            return Err(AgentSetupError::InvalidSettings(
                "max result rows must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for AgentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSettings")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("max_result_rows", &self.max_result_rows)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
