use std::fmt;
use std::str::FromStr;

use tradedesk_models::config::ContextKeyStyle;
use tradedesk_tools::{FINANCIAL_TOOLS, TRADE_EXECUTION_TOOLS};

use crate::prompts::{PromptTemplate, FINANCE_TEMPLATE, TRADE_EXECUTOR_TEMPLATE};

/// The specialized agents a supervisor can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Finance,
    TradeExecutor,
}

impl AgentRole {
    pub const ALL: [AgentRole; 2] = [AgentRole::Finance, AgentRole::TradeExecutor];

    /// Name stamped on the role's [`AgentState`](tradedesk_models::AgentState) records.
    pub fn agent_name(self) -> &'static str {
        match self {
            AgentRole::Finance => "finance_agent",
            AgentRole::TradeExecutor => "trade_executor_agent",
        }
    }

    /// Key under which runs are filed in `agent_states`, and prefix of the
    /// role's context keys.
    pub fn state_key(self, style: ContextKeyStyle) -> &'static str {
        match (self, style) {
            (AgentRole::Finance, ContextKeyStyle::Legacy) => "FinanceAgent",
            (AgentRole::Finance, ContextKeyStyle::SnakeCase) => "finance_agent",
            (AgentRole::TradeExecutor, _) => "trade_executor_agent",
        }
    }

    /// Catalog key of the role's tool set.
    pub fn tool_set_key(self) -> &'static str {
        match self {
            AgentRole::Finance => FINANCIAL_TOOLS,
            AgentRole::TradeExecutor => TRADE_EXECUTION_TOOLS,
        }
    }

    pub fn template(self) -> &'static PromptTemplate {
        match self {
            AgentRole::Finance => &FINANCE_TEMPLATE,
            AgentRole::TradeExecutor => &TRADE_EXECUTOR_TEMPLATE,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.agent_name())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "finance" | "finance_agent" | "financeagent" => Ok(AgentRole::Finance),
            "trade" | "trade_executor" | "trade_executor_agent" => Ok(AgentRole::TradeExecutor),
            other => Err(format!("unknown agent role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_keys_match_existing_consumers() {
        assert_eq!(
            AgentRole::Finance.state_key(ContextKeyStyle::Legacy),
            "FinanceAgent"
        );
        assert_eq!(
            AgentRole::TradeExecutor.state_key(ContextKeyStyle::Legacy),
            "trade_executor_agent"
        );
    }

    #[test]
    fn snake_case_keys_are_uniform() {
        for role in AgentRole::ALL {
            assert_eq!(role.state_key(ContextKeyStyle::SnakeCase), role.agent_name());
        }
    }

    #[test]
    fn parse_role_names() {
        assert_eq!("finance".parse::<AgentRole>().unwrap(), AgentRole::Finance);
        assert_eq!("FinanceAgent".parse::<AgentRole>().unwrap(), AgentRole::Finance);
        assert_eq!("trade".parse::<AgentRole>().unwrap(), AgentRole::TradeExecutor);
        assert!("risk".parse::<AgentRole>().is_err());
    }

    #[test]
    fn roles_use_distinct_tool_sets() {
        assert_ne!(
            AgentRole::Finance.tool_set_key(),
            AgentRole::TradeExecutor.tool_set_key()
        );
    }
}
