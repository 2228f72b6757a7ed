//! Versioned instruction templates, one per agent role.
//!
//! Templates are plain data. [`render`] fills the `{tools}`, `{wallet}` and
//! `{context}` placeholders and is pure, so prompts can be checked without a
//! reasoner.

use tradedesk_models::state::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub version: u32,
    /// Tools the role is told about, in the order it is told. Exactly these
    /// are bound to the reasoner.
    pub tools: &'static [&'static str],
    pub body: &'static str,
}

pub const FINANCE_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "finance",
    version: 1,
    tools: &[
        "pivotpoints",
        "engulfing",
        "three_white_soldiers",
        "morningstar",
    ],
    body: "You are an advanced technical analysis assistant equipped with specialized tools \
to detect candlestick patterns and calculate support/resistance levels. Your primary \
function is to help users analyze both stocks and cryptocurrencies using price action \
and chart-based signals.

If the user asks for candlestick patterns, support/resistance levels, or short-term \
market signals, use the appropriate tool.

Tools you have:
{tools}

Context so far:
{context}

- For stocks in India, append '.NS' for NSE or '.BO' for BSE when calling tools.
- For cryptocurrencies, use trading pairs (e.g. BTC/USDT, ETH/USDT).
- Before making a decision, review the context and past results to avoid redundant tool calls.
- Keep a professional, concise and objective tone.
- Aim for accurate, actionable technical insight that helps traders time entries and exits.

Always respond with:
1. Which tool you called
2. The result from that tool

Only use the tools you have. Do not invent results.",
};

pub const TRADE_EXECUTOR_TEMPLATE: PromptTemplate = PromptTemplate {
    name: "trade_executor",
    version: 1,
    tools: &["buy_tool", "sell_tool"],
    body: "You are a professional cryptocurrency trading assistant. Evaluate the \
instruction to either BUY or SELL crypto assets, and execute trades only when clearly \
instructed by the supervisor or user.

Tools you have:
{tools}

Only use these tools if the instruction asks for a real action (e.g. \"buy\", \"sell\").

User wallet address: {wallet}

Context so far:
{context}

Guidelines:
- Read the task carefully and analyze the context.
- Avoid duplicate or redundant trades.
- Use the appropriate tool for the side of the trade.
- Do not explain. Respond only by calling the tool with the correct parameters.",
};

/// Serialize the shared context for embedding in a prompt.
pub fn render_context(context: &Context) -> String {
    serde_json::to_string_pretty(context).unwrap_or_else(|_| "{}".to_string())
}

/// Fill a template. The context is substituted last so agent outputs stored
/// in it are never themselves treated as placeholders.
pub fn render(template: &PromptTemplate, context: &Context, wallet: &str) -> String {
    let tools = template
        .tools
        .iter()
        .map(|name| format!("  - {name}"))
        .collect::<Vec<_>>()
        .join("\n");

    template
        .body
        .replace("{tools}", &tools)
        .replace("{wallet}", wallet)
        .replace("{context}", &render_context(context))
}
