//! Trade-execution tools backed by a [`Broker`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::ToolError;
use crate::tool::{parameters_schema, parse_arguments, Tool};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Filled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub asset: String,
    pub amount: Decimal,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReceipt {
    pub order_id: Uuid,
    pub side: OrderSide,
    pub asset: String,
    pub amount: Decimal,
    pub wallet_address: String,
    pub status: OrderStatus,
    pub executed_at: DateTime<Utc>,
}

/// Executes orders. Mockable for testing.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn execute(&self, order: &OrderRequest) -> Result<OrderReceipt, ToolError>;
}

/// In-memory sandbox broker. Buys fill immediately; sells must be covered
/// by the wallet's paper holdings.
#[derive(Default)]
pub struct PaperBroker {
    holdings: Mutex<BTreeMap<String, BTreeMap<String, Decimal>>>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(wallet: &str, balances: BTreeMap<String, Decimal>) -> Self {
        let mut holdings = BTreeMap::new();
        let normalized = balances
            .into_iter()
            .map(|(asset, amount)| (asset.to_uppercase(), amount))
            .collect();
        holdings.insert(wallet.to_string(), normalized);
        Self {
            holdings: Mutex::new(holdings),
        }
    }

    pub async fn balance(&self, wallet: &str, asset: &str) -> Decimal {
        let holdings = self.holdings.lock().await;
        holdings
            .get(wallet)
            .and_then(|assets| assets.get(&asset.to_uppercase()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn execute(&self, order: &OrderRequest) -> Result<OrderReceipt, ToolError> {
        let asset = order.asset.to_uppercase();
        let mut holdings = self.holdings.lock().await;
        let position = holdings
            .entry(order.wallet_address.clone())
            .or_default()
            .entry(asset.clone())
            .or_insert(Decimal::ZERO);

        match order.side {
            OrderSide::Buy => *position += order.amount,
            OrderSide::Sell => {
                if *position < order.amount {
                    return Err(ToolError::Rejected(format!(
                        "insufficient {asset}: holding {}, selling {}",
                        position, order.amount
                    )));
                }
                *position -= order.amount;
            }
        }

        Ok(OrderReceipt {
            order_id: Uuid::new_v4(),
            side: order.side,
            asset,
            amount: order.amount,
            wallet_address: order.wallet_address.clone(),
            status: OrderStatus::Filled,
            executed_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TradeArgs {
    /// Asset ticker, e.g. BTC or ETH.
    pub asset: String,
    /// Quantity of the asset to trade.
    #[schemars(with = "f64")]
    pub amount: Decimal,
    /// Wallet to trade from. Defaults to the session wallet.
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// `buy_tool` / `sell_tool`.
pub struct TradeTool {
    side: OrderSide,
    broker: Arc<dyn Broker>,
    default_wallet: String,
}

impl TradeTool {
    pub fn buy(broker: Arc<dyn Broker>, default_wallet: &str) -> Self {
        Self {
            side: OrderSide::Buy,
            broker,
            default_wallet: default_wallet.to_string(),
        }
    }

    pub fn sell(broker: Arc<dyn Broker>, default_wallet: &str) -> Self {
        Self {
            side: OrderSide::Sell,
            broker,
            default_wallet: default_wallet.to_string(),
        }
    }
}

#[async_trait]
impl Tool for TradeTool {
    fn name(&self) -> &str {
        match self.side {
            OrderSide::Buy => "buy_tool",
            OrderSide::Sell => "sell_tool",
        }
    }

    fn description(&self) -> &str {
        match self.side {
            OrderSide::Buy => "Buy `amount` of a crypto asset into the wallet.",
            OrderSide::Sell => "Sell `amount` of a crypto asset held in the wallet.",
        }
    }

    fn parameters(&self) -> serde_json::Value {
        parameters_schema::<TradeArgs>()
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: TradeArgs = parse_arguments(self.name(), arguments)?;
        if args.amount <= Decimal::ZERO {
            return Err(ToolError::InvalidArguments {
                tool: self.name().to_string(),
                reason: format!("amount must be positive, got {}", args.amount),
            });
        }
        if args.asset.trim().is_empty() {
            return Err(ToolError::InvalidArguments {
                tool: self.name().to_string(),
                reason: "asset is empty".to_string(),
            });
        }

        let order = OrderRequest {
            side: self.side,
            asset: args.asset.trim().to_string(),
            amount: args.amount,
            wallet_address: args
                .wallet_address
                .unwrap_or_else(|| self.default_wallet.clone()),
        };

        let receipt = self.broker.execute(&order).await?;
        info!(
            order_id = %receipt.order_id,
            side = ?receipt.side,
            asset = %receipt.asset,
            amount = %receipt.amount,
            "Order filled"
        );
        Ok(serde_json::to_value(receipt)?)
    }
}

/// The trade-execution tool set, in advertised order.
pub fn trade_tools(broker: Arc<dyn Broker>, default_wallet: &str) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(TradeTool::buy(Arc::clone(&broker), default_wallet)),
        Arc::new(TradeTool::sell(broker, default_wallet)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tradedesk_models::DEMO_WALLET_ADDRESS;

    #[tokio::test]
    async fn buy_fills_into_default_wallet() {
        let broker = Arc::new(PaperBroker::new());
        let buy = TradeTool::buy(broker.clone(), DEMO_WALLET_ADDRESS);

        let receipt = buy
            .invoke(json!({"asset": "eth", "amount": 1.5}))
            .await
            .unwrap();
        assert_eq!(receipt["status"], "filled");
        assert_eq!(receipt["side"], "buy");
        assert_eq!(receipt["asset"], "ETH");
        assert_eq!(receipt["wallet_address"], DEMO_WALLET_ADDRESS);
        assert_eq!(broker.balance(DEMO_WALLET_ADDRESS, "ETH").await, dec!(1.5));
    }

    #[tokio::test]
    async fn sell_requires_holdings() {
        let broker = Arc::new(PaperBroker::with_balances(
            DEMO_WALLET_ADDRESS,
            BTreeMap::from([("btc".to_string(), dec!(0.5))]),
        ));
        let sell = TradeTool::sell(broker.clone(), DEMO_WALLET_ADDRESS);

        let err = sell
            .invoke(json!({"asset": "BTC", "amount": "0.75"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Rejected(_)));
        assert_eq!(broker.balance(DEMO_WALLET_ADDRESS, "BTC").await, dec!(0.5));

        sell.invoke(json!({"asset": "BTC", "amount": "0.2"}))
            .await
            .unwrap();
        assert_eq!(broker.balance(DEMO_WALLET_ADDRESS, "BTC").await, dec!(0.3));
    }

    #[tokio::test]
    async fn explicit_wallet_overrides_default() {
        let broker = Arc::new(PaperBroker::new());
        let buy = TradeTool::buy(broker.clone(), DEMO_WALLET_ADDRESS);

        buy.invoke(json!({"asset": "SOL", "amount": 3, "wallet_address": "0xother"}))
            .await
            .unwrap();
        assert_eq!(broker.balance("0xother", "SOL").await, dec!(3));
        assert_eq!(broker.balance(DEMO_WALLET_ADDRESS, "SOL").await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn non_positive_amount_is_invalid() {
        let buy = TradeTool::buy(Arc::new(PaperBroker::new()), DEMO_WALLET_ADDRESS);
        let err = buy
            .invoke(json!({"asset": "ETH", "amount": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn trade_tool_schema_requires_asset_and_amount() {
        let tools = trade_tools(Arc::new(PaperBroker::new()), DEMO_WALLET_ADDRESS);
        assert_eq!(tools[0].name(), "buy_tool");
        assert_eq!(tools[1].name(), "sell_tool");

        let schema = tools[0].parameters();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"asset"));
        assert!(required.contains(&"amount"));
        assert!(!required.contains(&"wallet_address"));
    }
}
