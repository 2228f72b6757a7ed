pub mod error;
pub mod financial;
pub mod registry;
pub mod signal;
pub mod taapi;
pub mod tool;
pub mod trade;

pub mod test_support;

pub use error::ToolError;
pub use registry::{
    DefaultToolProvider, ToolCatalog, ToolProvider, ToolSet, FINANCIAL_TOOLS,
    TRADE_EXECUTION_TOOLS,
};
pub use taapi::{IndicatorSource, TaapiClient};
pub use tool::{Tool, ToolSpec};
pub use trade::{Broker, OrderReceipt, OrderRequest, OrderSide, PaperBroker};
