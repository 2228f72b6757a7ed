use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::transcript::Message;

/// Insertion-ordered record of every agent's distilled output.
pub type Context = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("context key already present: {0}")]
    ContextCollision(String),
}

/// Normalized record of one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    pub agent_name: String,
    /// Full exchange with the reasoner. Kept for audit, never reprocessed.
    pub messages: Vec<Message>,
    /// Final assistant answer distilled from `messages`. None when the
    /// transcript carried no assistant-authored text.
    pub agent_output: Option<String>,
}

/// Shared record threaded through agent nodes by the supervisor.
///
/// Agent nodes borrow it mutably for the length of one invocation. The
/// context is append-only: [`SupervisorState::append_agent_state`] is the only
/// writer, and it refuses to replace an existing key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupervisorState {
    session_id: Uuid,
    user_query: String,
    current_task: Option<String>,
    #[serde(default)]
    context: Context,
    #[serde(default)]
    agent_states: BTreeMap<String, Vec<AgentState>>,
    created_at: DateTime<Utc>,
}

/// Build the context key for the `step`-th (1-based) invocation of an agent.
pub fn context_key(agent: &str, step: usize) -> String {
    format!("{agent}_step{step}")
}

impl SupervisorState {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_query: user_query.into(),
            current_task: None,
            context: Context::new(),
            agent_states: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The task routed to the active agent. Blank tasks count as unassigned.
    pub fn current_task(&self) -> Option<&str> {
        self.current_task
            .as_deref()
            .filter(|task| !task.trim().is_empty())
    }

    pub fn assign_task(&mut self, task: impl Into<String>) {
        self.current_task = Some(task.into());
    }

    pub fn clear_task(&mut self) {
        self.current_task = None;
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn agent_states(&self) -> &BTreeMap<String, Vec<AgentState>> {
        &self.agent_states
    }

    /// Every recorded run of one agent, oldest first.
    pub fn runs(&self, agent: &str) -> &[AgentState] {
        self.agent_states
            .get(agent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Append a run under `agent` and publish its output at
    /// `{agent}_step{N}`, N being the post-append run count.
    ///
    /// Nothing is modified when the key is already taken.
    pub fn append_agent_state(
        &mut self,
        agent: &str,
        agent_state: AgentState,
    ) -> Result<String, StateError> {
        let step = self.runs(agent).len() + 1;
        let key = context_key(agent, step);
        if self.context.contains_key(&key) {
            return Err(StateError::ContextCollision(key));
        }

        let output = agent_state
            .agent_output
            .clone()
            .map(serde_json::Value::String)
            .unwrap_or(serde_json::Value::Null);

        self.agent_states
            .entry(agent.to_string())
            .or_default()
            .push(agent_state);
        self.context.insert(key.clone(), output);

        Ok(key)
    }
}
