use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wallet used by the sandboxed trade tools when none is given.
pub const DEMO_WALLET_ADDRESS: &str = "0x1234567890abcdef1234567890abcdef12345678";

/// Top-level configuration for tradedesk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradedeskConfig {
    pub reasoning: ReasoningConfig,
    pub tools: ToolsConfig,
    pub agents: AgentsConfig,
    pub store: StoreConfig,
}

/// OpenAI-compatible chat-completions endpoint backing the agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasoningConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request HTTP timeout.
    pub timeout_seconds: u64,
    /// Maximum model round trips in a single invocation.
    pub max_steps: u32,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: 60,
            max_steps: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub taapi: TaapiConfig,
    pub trade: TradeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaapiConfig {
    pub base_url: String,
    /// Environment variable holding the TAAPI secret.
    pub secret_env: String,
    pub timeout_seconds: u64,
}

impl Default for TaapiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.taapi.io".to_string(),
            secret_env: "TAAPI_KEY".to_string(),
            timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradeConfig {
    pub wallet_address: String,
    /// Opening paper balances per asset for the configured wallet.
    pub starting_balances: BTreeMap<String, Decimal>,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            wallet_address: DEMO_WALLET_ADDRESS.to_string(),
            starting_balances: BTreeMap::new(),
        }
    }
}

/// Naming convention for `agent_states` entries and context key prefixes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextKeyStyle {
    /// `FinanceAgent_stepN` / `trade_executor_agent_stepN`, as existing consumers expect.
    #[default]
    Legacy,
    /// `finance_agent_stepN` / `trade_executor_agent_stepN`.
    SnakeCase,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    pub context_keys: ContextKeyStyle,
}

/// Supervisor-side session persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub sqlite_path: String,
    pub memory_max_capacity: u64,
    pub memory_ttl_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/tradedesk_sessions.db".to_string(),
            memory_max_capacity: 1_000,
            memory_ttl_seconds: 300,
        }
    }
}
