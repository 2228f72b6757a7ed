pub mod builder;
pub mod chat;
pub mod error;
pub mod node;
pub mod prompts;
pub mod reasoning;
pub mod role;

pub mod test_support;

pub use builder::{build_agent_state, final_output};
pub use chat::{ChatCompletionsConfig, ChatCompletionsReasoner};
pub use error::AgentError;
pub use node::{AgentNode, NodeFailure, NodeOutcome};
pub use reasoning::{BoundTools, Reasoner};
pub use role::AgentRole;
