//! tradedesk - finance and trade-execution agents under a supervisor
//!
//! A supervisor owns a [`SupervisorState`](models::SupervisorState), assigns
//! one task at a time, and dispatches it to an [`AgentNode`](agents::AgentNode).
//! The node reasons with its role's tools and files the result under
//! `{Agent}_step{N}` in the shared, append-only context.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use tradedesk::agents::{AgentNode, AgentRole, ChatCompletionsReasoner};
//! use tradedesk::models::{SupervisorState, TradedeskConfig};
//! use tradedesk::store::SessionStore;
//! use tradedesk::Desk;
//! ```

pub use tradedesk_agents as agents;
pub use tradedesk_models as models;
pub use tradedesk_store as store;
pub use tradedesk_tools as tools;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tradedesk_agents::{
    AgentNode, AgentRole, ChatCompletionsConfig, ChatCompletionsReasoner, NodeOutcome, Reasoner,
};
use tradedesk_models::config::{ContextKeyStyle, TradedeskConfig, DEMO_WALLET_ADDRESS};
use tradedesk_models::SupervisorState;
use tradedesk_store::SessionStore;
use tradedesk_tools::{DefaultToolProvider, ToolError, ToolProvider, ToolSpec};

/// Read and parse a TOML configuration file.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<TradedeskConfig> {
    let path = path.as_ref();
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&config_str).with_context(|| "Failed to parse config")
}

/// Shared wiring for every agent node: one reasoner, one tool provider.
pub struct Desk {
    reasoner: Arc<dyn Reasoner>,
    tools: Arc<dyn ToolProvider>,
    key_style: ContextKeyStyle,
    wallet_address: String,
}

impl Desk {
    pub fn new(reasoner: Arc<dyn Reasoner>, tools: Arc<dyn ToolProvider>) -> Self {
        Self {
            reasoner,
            tools,
            key_style: ContextKeyStyle::default(),
            wallet_address: DEMO_WALLET_ADDRESS.to_string(),
        }
    }

    /// Chat-completions reasoner plus TAAPI indicators and a paper broker.
    pub fn from_config(config: &TradedeskConfig) -> anyhow::Result<Self> {
        let reasoner = ChatCompletionsReasoner::new(ChatCompletionsConfig::from_config(
            &config.reasoning,
        ))
        .context("Failed to build reasoner")?;
        let tools = DefaultToolProvider::from_config(&config.tools)
            .context("Failed to build tool provider")?;

        Ok(Self::new(Arc::new(reasoner), Arc::new(tools))
            .with_key_style(config.agents.context_keys)
            .with_wallet_address(config.tools.trade.wallet_address.clone()))
    }

    pub fn with_key_style(mut self, style: ContextKeyStyle) -> Self {
        self.key_style = style;
        self
    }

    pub fn with_wallet_address(mut self, wallet_address: impl Into<String>) -> Self {
        self.wallet_address = wallet_address.into();
        self
    }

    pub fn node(&self, role: AgentRole) -> AgentNode {
        AgentNode::new(role, Arc::clone(&self.reasoner), Arc::clone(&self.tools))
            .with_key_style(self.key_style)
            .with_wallet_address(self.wallet_address.clone())
    }

    /// Specs of the tools a role is bound with, in advertised order.
    pub async fn tool_specs(&self, role: AgentRole) -> Result<Vec<ToolSpec>, ToolError> {
        let catalog = self.tools.resolve_tools().await?;
        let declared = role.template().tools;
        Ok(catalog
            .specs(role.tool_set_key())
            .into_iter()
            .filter(|spec| declared.contains(&spec.name.as_str()))
            .collect())
    }

    /// One supervisor step: assign `task`, run the role's node, persist the
    /// state whatever the outcome.
    ///
    /// A failed or cancelled run is saved with the task still assigned.
    pub async fn dispatch(
        &self,
        store: &SessionStore,
        state: &mut SupervisorState,
        role: AgentRole,
        task: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<NodeOutcome> {
        state.assign_task(task);
        let result = self.node(role).run_until_cancelled(state, cancel).await;

        store
            .save(state)
            .await
            .with_context(|| format!("Failed to save session {}", state.session_id()))?;

        match result {
            Ok(outcome) => {
                info!(
                    session = %state.session_id(),
                    role = %role,
                    outcome = ?outcome,
                    "Dispatch finished"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(session = %state.session_id(), role = %role, error = %e, "Dispatch failed");
                Err(anyhow::Error::new(e).context(format!("{role} failed")))
            }
        }
    }
}
