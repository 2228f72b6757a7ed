pub mod config;
pub mod state;
pub mod transcript;

pub use config::{
    AgentsConfig, ContextKeyStyle, ReasoningConfig, StoreConfig, TaapiConfig, ToolsConfig,
    TradeConfig, TradedeskConfig, DEMO_WALLET_ADDRESS,
};
pub use state::{context_key, AgentState, Context, StateError, SupervisorState};
pub use transcript::{Message, Role, ToolCall, Transcript};
