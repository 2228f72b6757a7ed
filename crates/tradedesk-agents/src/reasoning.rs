use std::sync::Arc;

use async_trait::async_trait;
use tradedesk_models::transcript::{ToolCall, Transcript};
use tradedesk_tools::{Tool, ToolError, ToolSet, ToolSpec};

use crate::error::AgentError;

/// Tools handed to a reasoner for one invocation.
///
/// Built through [`BoundTools::sequential`], which disables parallel tool
/// calls: the reasoner may request at most one tool per step.
#[derive(Clone)]
pub struct BoundTools {
    tools: ToolSet,
    parallel_tool_calls: bool,
}

impl BoundTools {
    pub fn sequential(tools: ToolSet) -> Self {
        Self {
            tools,
            parallel_tool_calls: false,
        }
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn parallel_tool_calls(&self) -> bool {
        self.parallel_tool_calls
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Run a requested call against the bound tool of the same name.
    pub async fn call(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        tool.invoke(call.arguments.clone()).await
    }
}

/// The tool-invoking reasoning capability behind every agent node.
///
/// One call is one complete reasoning run: the implementation may perform any
/// number of tool calls internally and returns the ordered transcript. The
/// task is the sole user message; `instructions` is the system context.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn invoke(
        &self,
        task: &str,
        tools: &BoundTools,
        instructions: &str,
    ) -> Result<Transcript, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradedesk_models::DEMO_WALLET_ADDRESS;
    use tradedesk_tools::trade::trade_tools;
    use tradedesk_tools::PaperBroker;

    fn bound() -> BoundTools {
        BoundTools::sequential(trade_tools(Arc::new(PaperBroker::new()), DEMO_WALLET_ADDRESS))
    }

    #[test]
    fn sequential_binding_disables_parallel_calls() {
        let tools = bound();
        assert!(!tools.parallel_tool_calls());
        assert_eq!(tools.names(), vec!["buy_tool", "sell_tool"]);
    }

    #[tokio::test]
    async fn call_dispatches_by_name() {
        let tools = bound();
        let result = tools
            .call(&ToolCall {
                id: "c1".to_string(),
                name: "buy_tool".to_string(),
                arguments: serde_json::json!({"asset": "ETH", "amount": 1}),
            })
            .await
            .unwrap();
        assert_eq!(result["status"], "filled");
    }

    #[tokio::test]
    async fn unbound_tool_is_refused() {
        let err = bound()
            .call(&ToolCall {
                id: "c1".to_string(),
                name: "pivotpoints".to_string(),
                arguments: serde_json::json!({}),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "pivotpoints"));
    }
}
