//! Technical-analysis tools: pivot levels and candlestick pattern detection.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

use crate::error::ToolError;
use crate::signal::{classify, PatternLabels, ENGULFING, MORNING_STAR, THREE_WHITE_SOLDIERS};
use crate::taapi::{IndicatorSource, Query};
use crate::tool::{parameters_schema, parse_arguments, Tool};

fn default_symbol() -> String {
    "BTC/USDT".to_string()
}
fn default_exchange() -> String {
    "binance".to_string()
}
fn default_daily() -> String {
    "1d".to_string()
}
fn default_hourly() -> String {
    "1h".to_string()
}
fn default_chart() -> String {
    "candles".to_string()
}
fn default_true() -> bool {
    true
}
fn default_penetration() -> f64 {
    0.3
}

/// Number of historical results: a count, or `"max"`.
#[derive(Debug, Clone, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum ResultsArg {
    Count(u32),
    Text(String),
}

impl ResultsArg {
    fn to_query_value(&self) -> String {
        match self {
            ResultsArg::Count(n) => n.to_string(),
            ResultsArg::Text(s) => s.clone(),
        }
    }
}

/// Candle window options shared by the historical endpoints.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryArgs {
    /// Candles to look back from the last closed one.
    #[serde(default)]
    pub backtrack: u32,
    /// `candles` or `heikinashi`.
    #[serde(default = "default_chart")]
    pub chart: String,
    #[serde(default)]
    pub add_result_timestamp: bool,
    /// Unix epoch start for historical values.
    #[serde(default)]
    pub from_timestamp: Option<i64>,
    /// Unix epoch end for historical values.
    #[serde(default)]
    pub to_timestamp: Option<i64>,
    /// Fill gaps in thin markets.
    #[serde(default = "default_true")]
    pub gaps: bool,
    #[serde(default)]
    pub results: Option<ResultsArg>,
}

impl HistoryArgs {
    fn append_to(&self, query: &mut Query, default_results: &str) {
        query.push(("backtrack".to_string(), self.backtrack.to_string()));
        query.push(("chart".to_string(), self.chart.clone()));
        query.push((
            "addResultTimestamp".to_string(),
            self.add_result_timestamp.to_string(),
        ));
        query.push(("gaps".to_string(), self.gaps.to_string()));
        let results = self
            .results
            .as_ref()
            .map(ResultsArg::to_query_value)
            .unwrap_or_else(|| default_results.to_string());
        query.push(("results".to_string(), results));
        if let Some(from) = self.from_timestamp {
            query.push(("fromTimestamp".to_string(), from.to_string()));
        }
        if let Some(to) = self.to_timestamp {
            query.push(("toTimestamp".to_string(), to.to_string()));
        }
    }
}

fn market_query(symbol: &str, interval: &str, exchange: &str) -> Query {
    vec![
        ("exchange".to_string(), exchange.to_string()),
        ("symbol".to_string(), symbol.to_string()),
        ("interval".to_string(), interval.to_string()),
    ]
}

async fn fetch_pattern(
    source: &dyn IndicatorSource,
    endpoint: &str,
    labels: &PatternLabels,
    market: (&str, &str, &str),
    query: Query,
) -> Result<serde_json::Value, ToolError> {
    let (symbol, interval, exchange) = market;
    let payload = source.fetch(endpoint, &query).await?;
    let classified = classify(endpoint, &payload, labels)?;
    debug!(endpoint, symbol, pattern = %classified.pattern_type, "Pattern classified");
    Ok(serde_json::json!({
        "symbol": symbol,
        "interval": interval,
        "exchange": exchange,
        "pattern_type": classified.pattern_type,
        "value": classified.value,
    }))
}

// --- pivot points ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PivotPointsArgs {
    /// Pair in COIN/MARKET form, e.g. BTC/USDT.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// 1d or 1w give the most useful levels.
    #[serde(default = "default_daily")]
    pub interval: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(flatten)]
    pub history: HistoryArgs,
}

/// Traditional pivot points (support and resistance levels r3..s3).
pub struct PivotPointsTool {
    source: Arc<dyn IndicatorSource>,
}

impl PivotPointsTool {
    pub fn new(source: Arc<dyn IndicatorSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for PivotPointsTool {
    fn name(&self) -> &str {
        "pivotpoints"
    }

    fn description(&self) -> &str {
        "Calculate traditional pivot points (support and resistance levels r3, r2, r1, p, \
         s1, s2, s3) for a symbol. Use interval 1d or 1w for daily/weekly levels."
    }

    fn parameters(&self) -> serde_json::Value {
        parameters_schema::<PivotPointsArgs>()
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: PivotPointsArgs = parse_arguments(self.name(), arguments)?;
        let mut query = market_query(&args.symbol, &args.interval, &args.exchange);
        args.history.append_to(&mut query, "1");

        let levels = self.source.fetch("pivotpoints", &query).await?;
        Ok(serde_json::json!({
            "symbol": args.symbol,
            "interval": args.interval,
            "pivot_points": levels,
        }))
    }
}

// --- engulfing --------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EngulfingArgs {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_hourly")]
    pub interval: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

/// Bullish/bearish engulfing reversal detection.
pub struct EngulfingTool {
    source: Arc<dyn IndicatorSource>,
}

impl EngulfingTool {
    pub fn new(source: Arc<dyn IndicatorSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for EngulfingTool {
    fn name(&self) -> &str {
        "engulfing"
    }

    fn description(&self) -> &str {
        "Detect the Engulfing candlestick pattern (bullish or bearish reversal) on a symbol \
         and timeframe."
    }

    fn parameters(&self) -> serde_json::Value {
        parameters_schema::<EngulfingArgs>()
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: EngulfingArgs = parse_arguments(self.name(), arguments)?;
        let query = market_query(&args.symbol, &args.interval, &args.exchange);
        fetch_pattern(
            self.source.as_ref(),
            "engulfing",
            &ENGULFING,
            (&args.symbol, &args.interval, &args.exchange),
            query,
        )
        .await
    }
}

// --- three white soldiers -------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ThreeWhiteSoldiersArgs {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_hourly")]
    pub interval: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(flatten)]
    pub history: HistoryArgs,
}

/// Three advancing white soldiers: three long bullish candles in a row.
pub struct ThreeWhiteSoldiersTool {
    source: Arc<dyn IndicatorSource>,
}

impl ThreeWhiteSoldiersTool {
    pub fn new(source: Arc<dyn IndicatorSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for ThreeWhiteSoldiersTool {
    fn name(&self) -> &str {
        "three_white_soldiers"
    }

    fn description(&self) -> &str {
        "Detect the Three Advancing White Soldiers pattern, a bullish reversal of three \
         consecutive long-bodied candles. Set results > 1 for a history of readings."
    }

    fn parameters(&self) -> serde_json::Value {
        parameters_schema::<ThreeWhiteSoldiersArgs>()
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ThreeWhiteSoldiersArgs = parse_arguments(self.name(), arguments)?;
        let mut query = market_query(&args.symbol, &args.interval, &args.exchange);
        args.history.append_to(&mut query, "1");
        fetch_pattern(
            self.source.as_ref(),
            "threewhitesoldiers",
            &THREE_WHITE_SOLDIERS,
            (&args.symbol, &args.interval, &args.exchange),
            query,
        )
        .await
    }
}

// --- morning star -----------------------------------------------------------

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MorningStarArgs {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_hourly")]
    pub interval: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(flatten)]
    pub history: HistoryArgs,
    /// Penetration factor used in pattern recognition.
    #[serde(default = "default_penetration")]
    pub opt_in_penetration: f64,
}

/// Morning star: bearish candle, small indecisive candle, strong bullish close.
pub struct MorningStarTool {
    source: Arc<dyn IndicatorSource>,
}

impl MorningStarTool {
    pub fn new(source: Arc<dyn IndicatorSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for MorningStarTool {
    fn name(&self) -> &str {
        "morningstar"
    }

    fn description(&self) -> &str {
        "Detect the Morning Star bullish reversal pattern on a symbol and timeframe. \
         Returns the last 10 readings unless results is given."
    }

    fn parameters(&self) -> serde_json::Value {
        parameters_schema::<MorningStarArgs>()
    }

    async fn invoke(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: MorningStarArgs = parse_arguments(self.name(), arguments)?;
        let mut query = market_query(&args.symbol, &args.interval, &args.exchange);
        args.history.append_to(&mut query, "10");
        query.push((
            "optInPenetration".to_string(),
            args.opt_in_penetration.to_string(),
        ));
        fetch_pattern(
            self.source.as_ref(),
            "morningstar",
            &MORNING_STAR,
            (&args.symbol, &args.interval, &args.exchange),
            query,
        )
        .await
    }
}

/// The full financial tool set, in advertised order.
pub fn financial_tools(source: Arc<dyn IndicatorSource>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(PivotPointsTool::new(Arc::clone(&source))),
        Arc::new(EngulfingTool::new(Arc::clone(&source))),
        Arc::new(ThreeWhiteSoldiersTool::new(Arc::clone(&source))),
        Arc::new(MorningStarTool::new(source)),
    ]
}
