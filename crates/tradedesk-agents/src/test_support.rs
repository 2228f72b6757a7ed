//! Test support: a scripted reasoner that records how it was invoked.
//!
//! `ScriptedReasoner` plays back canned replies in order. Assistant turns that
//! request tools are executed against whatever tools the node bound, so a
//! test sees real tool results and can assert which tools each role got.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tradedesk_models::transcript::{Message, Transcript};
use tradedesk_models::DEMO_WALLET_ADDRESS;
use tradedesk_tools::test_support::StaticIndicatorSource;
use tradedesk_tools::{DefaultToolProvider, PaperBroker, ToolProvider};

use crate::error::AgentError;
use crate::reasoning::{BoundTools, Reasoner};

/// One recorded `invoke` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub task: String,
    pub instructions: String,
    pub tool_names: Vec<String>,
    pub parallel_tool_calls: bool,
}

enum Script {
    Reply(Vec<Message>),
    Fail(String),
}

pub struct ScriptedReasoner {
    script: Mutex<VecDeque<Script>>,
    invocations: Mutex<Vec<Invocation>>,
    pending: bool,
}

impl Default for ScriptedReasoner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            invocations: Mutex::new(Vec::new()),
            pending: false,
        }
    }

    /// A reasoner whose invocations never complete.
    pub fn pending() -> Self {
        let mut reasoner = Self::new();
        reasoner.pending = true;
        reasoner
    }

    /// Queue a reply. The transcript returned is the task as a user message
    /// followed by `messages`, with tool results spliced in after each
    /// tool-requesting turn.
    pub fn reply(self, messages: Vec<Message>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Script::Reply(messages));
        }
        self
    }

    /// Queue a failed invocation.
    pub fn fail(self, reason: &str) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Script::Fail(reason.to_string()));
        }
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|i| i.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn invoke(
        &self,
        task: &str,
        tools: &BoundTools,
        instructions: &str,
    ) -> Result<Transcript, AgentError> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(Invocation {
                task: task.to_string(),
                instructions: instructions.to_string(),
                tool_names: tools.names(),
                parallel_tool_calls: tools.parallel_tool_calls(),
            });
        }

        if self.pending {
            std::future::pending::<()>().await;
        }

        let next = self
            .script
            .lock()
            .map_err(|e| AgentError::Reasoning(format!("script poisoned: {e}")))?
            .pop_front();

        let messages = match next {
            Some(Script::Reply(messages)) => messages,
            Some(Script::Fail(reason)) => return Err(AgentError::Reasoning(reason)),
            None => return Err(AgentError::Reasoning("script exhausted".to_string())),
        };

        let mut transcript = vec![Message::user(task)];
        for message in messages {
            let calls = message.tool_calls.clone();
            transcript.push(message);
            for call in &calls {
                let content = match tools.call(call).await {
                    Ok(value) => value.to_string(),
                    Err(e) => format!("Error: {e}"),
                };
                transcript.push(Message::tool_result(&call.id, content));
            }
        }
        Ok(transcript)
    }
}

/// Tool provider over canned indicator payloads and an empty paper broker.
pub fn test_tool_provider() -> Arc<dyn ToolProvider> {
    let indicators = StaticIndicatorSource::new()
        .with(
            "pivotpoints",
            serde_json::json!({"r1": 43000.0, "p": 42150.0, "s1": 41300.0}),
        )
        .with("engulfing", serde_json::json!({"value": 100}))
        .with("threewhitesoldiers", serde_json::json!({"value": 0}))
        .with("morningstar", serde_json::json!({"value": [0, 0, 100]}));

    Arc::new(DefaultToolProvider::new(
        Arc::new(indicators),
        Arc::new(PaperBroker::new()),
        DEMO_WALLET_ADDRESS,
    ))
}
