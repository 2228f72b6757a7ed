//! Test doubles for the indicator layer.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ToolError;
use crate::taapi::{IndicatorSource, Query};

/// Answers each endpoint with a canned payload and records every request.
/// Unknown endpoints fail with a 404 status error.
#[derive(Default)]
pub struct StaticIndicatorSource {
    responses: BTreeMap<String, serde_json::Value>,
    calls: Mutex<Vec<(String, Query)>>,
}

impl StaticIndicatorSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, endpoint: &str, payload: serde_json::Value) -> Self {
        self.responses.insert(endpoint.to_string(), payload);
        self
    }

    /// Requests seen so far, oldest first.
    pub fn calls(&self) -> Vec<(String, Query)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl IndicatorSource for StaticIndicatorSource {
    async fn fetch(&self, endpoint: &str, query: &Query) -> Result<serde_json::Value, ToolError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((endpoint.to_string(), query.clone()));
        }
        self.responses
            .get(endpoint)
            .cloned()
            .ok_or_else(|| ToolError::Status {
                endpoint: endpoint.to_string(),
                status: 404,
                body: "no canned response".to_string(),
            })
    }
}
