//! Reasoner backed by an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tradedesk_models::config::ReasoningConfig;
use tradedesk_models::transcript::{Message, Role, ToolCall, Transcript};

use crate::error::AgentError;
use crate::reasoning::{BoundTools, Reasoner};

/// Configuration for a chat-completions reasoner.
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_steps: u32,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
            max_steps: 8,
        }
    }
}

impl ChatCompletionsConfig {
    /// Resolve from configuration, reading the key from the configured env var.
    pub fn from_config(config: &ReasoningConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            warn!(env = %config.api_key_env, "Reasoning API key not set");
        }
        Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
            timeout: Duration::from_secs(config.timeout_seconds),
            max_steps: config.max_steps,
        }
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{base}/chat/completions")
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument object.
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

fn function_kind() -> String {
    "function".to_string()
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn to_wire(message: &Message) -> WireMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };
    WireMessage {
        role: role_name(message.role).to_string(),
        content: message.content.clone(),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn from_wire(message: WireMessage) -> Result<Message, AgentError> {
    if message.role != "assistant" {
        return Err(AgentError::Reasoning(format!(
            "expected assistant reply, got role {}",
            message.role
        )));
    }
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let arguments = if call.function.arguments.trim().is_empty() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    AgentError::Reasoning(format!(
                        "malformed arguments for {}: {e}",
                        call.function.name
                    ))
                })?
            };
            Ok(ToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            })
        })
        .collect::<Result<Vec<_>, AgentError>>()?;

    Ok(Message {
        role: Role::Assistant,
        content: message.content,
        name: None,
        tool_calls,
        tool_call_id: None,
    })
}

/// ReAct-style loop over chat completions: call the model, run the tool it
/// asks for, repeat until it answers without tool calls.
///
/// At most one tool runs per step. Extra calls in a reply are dropped from
/// the transcript before anything executes.
pub struct ChatCompletionsReasoner {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
}

impl ChatCompletionsReasoner {
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Reasoning(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn request<'a>(
        &'a self,
        instructions: &str,
        transcript: &[Message],
        tools: &BoundTools,
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: Some(instructions.to_string()),
            tool_calls: None,
            tool_call_id: None,
        });
        messages.extend(transcript.iter().map(to_wire));

        let wire_tools: Vec<WireTool> = tools
            .specs()
            .into_iter()
            .map(|spec| WireTool {
                kind: "function",
                function: WireFunction {
                    name: spec.name,
                    description: spec.description,
                    parameters: spec.parameters,
                },
            })
            .collect();

        let parallel_tool_calls = if wire_tools.is_empty() {
            None
        } else {
            Some(tools.parallel_tool_calls())
        };

        ChatRequest {
            model: &self.config.model,
            messages,
            tools: wire_tools,
            parallel_tool_calls,
        }
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<Message, AgentError> {
        let mut http = self.client.post(self.config.endpoint()).json(request);
        if let Some(key) = &self.config.api_key {
            http = http.bearer_auth(key);
        }

        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout(self.config.timeout)
            } else {
                AgentError::Reasoning(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Chat completion failed");
            return Err(AgentError::Reasoning(format!(
                "chat completion returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Reasoning(format!("invalid completion body: {e}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Reasoning("completion had no choices".to_string()))?;
        from_wire(choice.message)
    }
}

#[async_trait]
impl Reasoner for ChatCompletionsReasoner {
    async fn invoke(
        &self,
        task: &str,
        tools: &BoundTools,
        instructions: &str,
    ) -> Result<Transcript, AgentError> {
        let mut transcript = vec![Message::user(task)];

        for step in 0..self.config.max_steps {
            let request = self.request(instructions, &transcript, tools);
            let mut reply = self.complete(&request).await?;
            if !tools.parallel_tool_calls() && reply.tool_calls.len() > 1 {
                warn!(
                    requested = reply.tool_calls.len(),
                    "Model asked for parallel tool calls; running only the first"
                );
                reply.tool_calls.truncate(1);
            }
            let calls = reply.tool_calls.clone();
            debug!(step, tool_calls = calls.len(), model = %self.config.model, "Model replied");
            transcript.push(reply);

            if calls.is_empty() {
                return Ok(transcript);
            }

            for call in &calls {
                let content = match tools.call(call).await {
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool call failed");
                        format!("Error: {e}")
                    }
                };
                transcript.push(Message::tool_result(&call.id, content));
            }
        }

        Err(AgentError::StepLimit(self.config.max_steps))
    }
}
