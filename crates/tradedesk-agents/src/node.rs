use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tradedesk_models::config::{ContextKeyStyle, DEMO_WALLET_ADDRESS};
use tradedesk_models::state::SupervisorState;
use tradedesk_tools::{ToolProvider, ToolSet};

use crate::builder::build_agent_state;
use crate::error::AgentError;
use crate::prompts::render;
use crate::reasoning::{BoundTools, Reasoner};
use crate::role::AgentRole;

/// What a node invocation did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    /// No task was assigned; the state was not touched.
    Skipped,
    /// The run was merged and its answer published under `key`.
    Completed { key: String },
    /// The run was merged, but the transcript held no final answer, so
    /// `key` maps to null. The supervisor decides whether that is a failure.
    EmptyOutcome { key: String },
}

impl NodeOutcome {
    pub fn key(&self) -> Option<&str> {
        match self {
            NodeOutcome::Skipped => None,
            NodeOutcome::Completed { key } | NodeOutcome::EmptyOutcome { key } => Some(key),
        }
    }
}

/// A failed owned-state invocation. The state comes back unmodified, task
/// still assigned.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct NodeFailure {
    pub state: SupervisorState,
    #[source]
    pub error: AgentError,
}

/// Executes one task for one role against a supervisor state.
pub struct AgentNode {
    role: AgentRole,
    reasoner: Arc<dyn Reasoner>,
    tools: Arc<dyn ToolProvider>,
    key_style: ContextKeyStyle,
    wallet_address: String,
}

impl AgentNode {
    pub fn new(role: AgentRole, reasoner: Arc<dyn Reasoner>, tools: Arc<dyn ToolProvider>) -> Self {
        Self {
            role,
            reasoner,
            tools,
            key_style: ContextKeyStyle::default(),
            wallet_address: DEMO_WALLET_ADDRESS.to_string(),
        }
    }

    pub fn finance(reasoner: Arc<dyn Reasoner>, tools: Arc<dyn ToolProvider>) -> Self {
        Self::new(AgentRole::Finance, reasoner, tools)
    }

    pub fn trade_executor(reasoner: Arc<dyn Reasoner>, tools: Arc<dyn ToolProvider>) -> Self {
        Self::new(AgentRole::TradeExecutor, reasoner, tools)
    }

    pub fn with_key_style(mut self, style: ContextKeyStyle) -> Self {
        self.key_style = style;
        self
    }

    pub fn with_wallet_address(mut self, wallet_address: impl Into<String>) -> Self {
        self.wallet_address = wallet_address.into();
        self
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// `agent_states` entry and context key prefix used by this node.
    pub fn state_key(&self) -> &'static str {
        self.role.state_key(self.key_style)
    }

    /// System instructions for the state's current context.
    pub fn instructions(&self, state: &SupervisorState) -> String {
        render(self.role.template(), state.context(), &self.wallet_address)
    }

    /// Pick exactly the template's declared tools out of the role's set.
    fn bind(&self, available: &ToolSet) -> Result<BoundTools, AgentError> {
        let declared = self.role.template().tools;
        let mut selected = Vec::with_capacity(declared.len());
        for name in declared {
            let tool = available
                .iter()
                .find(|t| t.name() == *name)
                .ok_or_else(|| AgentError::MissingTool {
                    agent: self.role.agent_name().to_string(),
                    tool: name.to_string(),
                })?;
            selected.push(Arc::clone(tool));
        }
        Ok(BoundTools::sequential(selected))
    }

    /// Run the assigned task and merge the result into `state`.
    ///
    /// Without a task this is a no-op. On error the state is left exactly as
    /// it was, `current_task` included, so the supervisor can retry or give up.
    pub async fn run(&self, state: &mut SupervisorState) -> Result<NodeOutcome, AgentError> {
        let agent = self.role.agent_name();
        let Some(task) = state.current_task().map(str::to_string) else {
            debug!(agent, "No task assigned, skipping");
            return Ok(NodeOutcome::Skipped);
        };

        let start = Instant::now();
        info!(agent, session = %state.session_id(), task = %task, "Agent task assigned");

        let instructions = self.instructions(state);
        debug!(agent, chars = instructions.len(), "Instructions rendered");

        let catalog = self.tools.resolve_tools().await?;
        let available = catalog
            .get(self.role.tool_set_key())
            .ok_or_else(|| AgentError::MissingToolSet(self.role.tool_set_key().to_string()))?;
        let tools = self.bind(available)?;
        debug!(agent, tools = ?tools.names(), "Tools bound");

        let transcript = match self.reasoner.invoke(&task, &tools, &instructions).await {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!(agent, error = %e, elapsed_ms = start.elapsed().as_millis(), "Reasoning failed");
                return Err(e);
            }
        };

        let agent_state = build_agent_state(transcript, agent);
        let empty = agent_state.agent_output.is_none();
        let messages = agent_state.messages.len();
        let key = state.append_agent_state(self.state_key(), agent_state)?;
        state.clear_task();

        if empty {
            warn!(agent, key = %key, "Transcript had no final answer");
            Ok(NodeOutcome::EmptyOutcome { key })
        } else {
            info!(
                agent,
                key = %key,
                messages,
                elapsed_ms = start.elapsed().as_millis(),
                "Agent task complete"
            );
            Ok(NodeOutcome::Completed { key })
        }
    }

    /// [`AgentNode::run`], abandoned as soon as `cancel` fires.
    ///
    /// Cancellation surfaces as [`AgentError::Cancelled`] with the task still
    /// assigned.
    pub async fn run_until_cancelled(
        &self,
        state: &mut SupervisorState,
        cancel: &CancellationToken,
    ) -> Result<NodeOutcome, AgentError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(agent = self.role.agent_name(), "Agent invocation cancelled");
                Err(AgentError::Cancelled)
            }
            result = self.run(state) => result,
        }
    }

    /// [`AgentNode::run`] bounded by a caller-chosen deadline.
    pub async fn run_with_timeout(
        &self,
        state: &mut SupervisorState,
        timeout: Duration,
    ) -> Result<NodeOutcome, AgentError> {
        tokio::time::timeout(timeout, self.run(state))
            .await
            .map_err(|_| AgentError::Timeout(timeout))?
    }

    /// Value-passing form: takes the state, hands back the updated state, or
    /// the untouched state alongside the error.
    pub async fn run_owned(
        &self,
        mut state: SupervisorState,
    ) -> Result<(SupervisorState, NodeOutcome), NodeFailure> {
        match self.run(&mut state).await {
            Ok(outcome) => Ok((state, outcome)),
            Err(error) => Err(NodeFailure { state, error }),
        }
    }
}
