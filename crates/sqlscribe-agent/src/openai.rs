//! OpenAI chat-completions agent with function calling

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::{
    AgentError, AgentMetadata, AgentResult, AgentSettings, AgentSetupError, QueryAgent,
    SqlToolkit,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn tool_output(call_id: &str, output: &Json) -> Self {
        Self {
            tool_call_id: Some(call_id.to_string()),
            ..Self::new("tool", &output.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    tools: &'a Json,
    tool_choice: &'a str,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Query agent backed by an OpenAI-compatible chat-completions endpoint.
///
/// Each run starts a fresh conversation: system prompt, then the instruction.
/// Tool calls are executed against the [`SqlToolkit`] and fed back until the
/// model answers without calling a tool.
pub struct OpenAiSqlAgent {
    settings: AgentSettings,
    client: Client,
    toolkit: SqlToolkit,
    system_prompt: String,
    tools: Json,
}

impl OpenAiSqlAgent {
    pub fn new(
        settings: AgentSettings,
        toolkit: SqlToolkit,
        system_prompt: String,
    ) -> Result<Self, AgentSetupError> {
        settings.validate()?;

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| AgentSetupError::HttpClient(e.to_string()))?;

        tracing::info!(model = %settings.model, base_url = %settings.base_url, "SQL agent configured");

        Ok(Self {
            settings,
            client,
            toolkit,
            system_prompt,
            tools: SqlToolkit::definitions(),
        })
    }

    pub fn toolkit(&self) -> &SqlToolkit {
        &self.toolkit
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatMessage, AgentError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages,
            tools: &self.tools,
            tool_choice: "auto",
            temperature: self.settings.temperature,
        };

        let response = self
            .client
            .post(self.settings.completions_url())
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status.as_u16(), &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::InvalidResponse("response contained no choices".into()))?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("completion stopped at the token limit");
        }
        Ok(choice.message)
    }
}

#[async_trait]
impl QueryAgent for OpenAiSqlAgent {
    #[tracing::instrument(skip(self, instruction), fields(model = %self.settings.model))]
    async fn run(&self, instruction: &str) -> Result<AgentResult, AgentError> {
        let mut messages = vec![
            ChatMessage::new("system", &self.system_prompt),
            ChatMessage::new("user", instruction),
        ];

        for round in 1..=self.settings.max_tool_rounds {
            let reply = self.complete(&messages).await?;

            if reply.tool_calls.is_empty() {
                tracing::debug!(round, "agent produced a final answer");
                return Ok(AgentResult::from_content(
                    reply.content.as_deref().unwrap_or_default(),
                ));
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for call in calls {
                if call.kind != "function" {
                    return Err(AgentError::ToolContract(format!(
                        "unsupported tool call type '{}'",
                        call.kind
                    )));
                }
                tracing::info!(round, tool = %call.function.name, "running tool call");
                let output = self
                    .toolkit
                    .call(&call.function.name, &call.function.arguments)
                    .await;
                messages.push(ChatMessage::tool_output(&call.id, &output));
            }
        }

        Err(AgentError::ToolRoundsExhausted(self.settings.max_tool_rounds))
    }

    fn metadata(&self) -> AgentMetadata {
        AgentMetadata {
            name: "openai-sql-agent".into(),
            model: self.settings.model.clone(),
        }
    }
}

/// Map a non-success HTTP status to an invocation error
fn classify_http_failure(status: u16, body: &str) -> AgentError {
    let message = api_error_message(body);
    match status {
        401 | 403 => AgentError::Authentication(message),
        429 => AgentError::RateLimited(message),
        400 | 404 | 422
            if message.to_ascii_lowercase().contains("tool")
                || message.to_ascii_lowercase().contains("function") =>
        {
            AgentError::ToolContract(message)
        }
        _ => AgentError::InvalidResponse(format!("status {}: {}", status, message)),
    }
}

/// Pull `error.message` out of an API error body, else a bounded excerpt of the body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Json>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(300).collect())
}
