use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tradedesk_models::config::ToolsConfig;

use crate::error::ToolError;
use crate::financial::financial_tools;
use crate::taapi::{IndicatorSource, TaapiClient};
use crate::tool::{Tool, ToolSpec};
use crate::trade::{trade_tools, Broker, PaperBroker};

/// Role key of the technical-analysis tool set.
pub const FINANCIAL_TOOLS: &str = "financial_tools";
/// Role key of the buy/sell tool set.
pub const TRADE_EXECUTION_TOOLS: &str = "trade_exe_tools";

pub type ToolSet = Vec<Arc<dyn Tool>>;

/// Tool sets keyed by role.
#[derive(Clone, Default)]
pub struct ToolCatalog {
    sets: BTreeMap<String, ToolSet>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, tools: ToolSet) {
        self.sets.insert(key.into(), tools);
    }

    pub fn with(mut self, key: impl Into<String>, tools: ToolSet) -> Self {
        self.insert(key, tools);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ToolSet> {
        self.sets.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn specs(&self, key: &str) -> Vec<ToolSpec> {
        self.get(key)
            .map(|tools| tools.iter().map(|t| t.spec()).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, tools) in &self.sets {
            let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
            map.entry(key, &names);
        }
        map.finish()
    }
}

/// Resolves the tool sets each agent role may use. Mockable for testing.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn resolve_tools(&self) -> Result<ToolCatalog, ToolError>;
}

/// Provider wiring the indicator tools to an [`IndicatorSource`] and the
/// trade tools to a [`Broker`].
pub struct DefaultToolProvider {
    indicators: Arc<dyn IndicatorSource>,
    broker: Arc<dyn Broker>,
    wallet_address: String,
}

impl DefaultToolProvider {
    pub fn new(
        indicators: Arc<dyn IndicatorSource>,
        broker: Arc<dyn Broker>,
        wallet_address: impl Into<String>,
    ) -> Self {
        Self {
            indicators,
            broker,
            wallet_address: wallet_address.into(),
        }
    }

    /// TAAPI-backed indicators plus a paper broker seeded from configuration.
    pub fn from_config(config: &ToolsConfig) -> Result<Self, ToolError> {
        let indicators = Arc::new(TaapiClient::from_config(&config.taapi)?);
        let broker = Arc::new(PaperBroker::with_balances(
            &config.trade.wallet_address,
            config.trade.starting_balances.clone(),
        ));
        Ok(Self::new(
            indicators,
            broker,
            config.trade.wallet_address.clone(),
        ))
    }
}

#[async_trait]
impl ToolProvider for DefaultToolProvider {
    async fn resolve_tools(&self) -> Result<ToolCatalog, ToolError> {
        let catalog = ToolCatalog::new()
            .with(FINANCIAL_TOOLS, financial_tools(Arc::clone(&self.indicators)))
            .with(
                TRADE_EXECUTION_TOOLS,
                trade_tools(Arc::clone(&self.broker), &self.wallet_address),
            );
        debug!(catalog = ?catalog, "Resolved tool catalog");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticIndicatorSource;
    use std::collections::BTreeSet;
    use tradedesk_models::DEMO_WALLET_ADDRESS;

    fn provider() -> DefaultToolProvider {
        DefaultToolProvider::new(
            Arc::new(StaticIndicatorSource::new()),
            Arc::new(PaperBroker::new()),
            DEMO_WALLET_ADDRESS,
        )
    }

    #[tokio::test]
    async fn catalog_has_both_role_sets() {
        let catalog = provider().resolve_tools().await.unwrap();
        let keys: Vec<&str> = catalog.keys().collect();
        assert_eq!(keys, vec![FINANCIAL_TOOLS, TRADE_EXECUTION_TOOLS]);
        assert_eq!(catalog.get(FINANCIAL_TOOLS).unwrap().len(), 4);
        assert_eq!(catalog.get(TRADE_EXECUTION_TOOLS).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn role_sets_are_disjoint() {
        let catalog = provider().resolve_tools().await.unwrap();
        let finance: BTreeSet<String> = catalog
            .specs(FINANCIAL_TOOLS)
            .into_iter()
            .map(|s| s.name)
            .collect();
        let trade: BTreeSet<String> = catalog
            .specs(TRADE_EXECUTION_TOOLS)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert!(finance.is_disjoint(&trade));
    }

    #[test]
    fn unknown_key_has_no_specs() {
        assert!(ToolCatalog::new().specs("nope").is_empty());
    }

    #[test]
    fn debug_lists_tool_names() {
        let catalog = ToolCatalog::new().with(
            TRADE_EXECUTION_TOOLS,
            trade_tools(Arc::new(PaperBroker::new()), DEMO_WALLET_ADDRESS),
        );
        let rendered = format!("{catalog:?}");
        assert!(rendered.contains("buy_tool"));
        assert!(rendered.contains("sell_tool"));
    }
}
