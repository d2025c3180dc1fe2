//! Natural-language query agent
//!
//! The agent talks to an OpenAI-compatible chat-completions endpoint and lets
//! the model explore the database through a small read-only toolkit. Whatever
//! the model finally answers is classified once into an [`AgentResult`].

mod agent;
mod error;
mod openai;
mod prompt;
mod result;
mod toolkit;

pub use agent::{AgentMetadata, AgentSettings, DEFAULT_BASE_URL, DEFAULT_MODEL, QueryAgent};
pub use error::{AgentError, AgentSetupError};
pub use openai::OpenAiSqlAgent;
pub use prompt::build_system_prompt;
pub use result::{AgentResult, TabularRow};
pub use toolkit::SqlToolkit;
