use std::time::Duration;

use thiserror::Error;
use tradedesk_models::StateError;
use tradedesk_tools::ToolError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Reasoning error: {0}")]
    Reasoning(String),

    #[error("Reasoning timed out after {0:?}")]
    Timeout(Duration),

    #[error("Agent invocation cancelled")]
    Cancelled,

    #[error("Reasoning exceeded {0} steps without a final answer")]
    StepLimit(u32),

    #[error("No tool set registered under {0}")]
    MissingToolSet(String),

    #[error("Tool {tool} declared for {agent} was not resolved")]
    MissingTool { agent: String, tool: String },

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}
