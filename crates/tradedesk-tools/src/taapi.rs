use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use tradedesk_models::config::TaapiConfig;

use crate::error::ToolError;

/// Query string as ordered key/value pairs.
pub type Query = Vec<(String, String)>;

/// Source of indicator and pattern readings. Mockable for testing.
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    /// GET `endpoint` with `query` and return the decoded JSON body.
    async fn fetch(&self, endpoint: &str, query: &Query) -> Result<serde_json::Value, ToolError>;
}

/// HTTP client for the TAAPI.IO indicator API.
pub struct TaapiClient {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
    secret_env: String,
}

impl TaapiClient {
    pub fn new(
        base_url: &str,
        secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
            secret_env: "TAAPI_KEY".to_string(),
        })
    }

    /// Build a client from configuration, reading the secret from the configured
    /// environment variable. A missing secret only fails once a tool is called.
    pub fn from_config(config: &TaapiConfig) -> Result<Self, ToolError> {
        let secret = std::env::var(&config.secret_env).ok();
        if secret.is_none() {
            warn!(env = %config.secret_env, "TAAPI secret not set; indicator tools will fail");
        }
        let mut client = Self::new(
            &config.base_url,
            secret,
            Duration::from_secs(config.timeout_seconds),
        )?;
        client.secret_env = config.secret_env.clone();
        Ok(client)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }
}

#[async_trait]
impl IndicatorSource for TaapiClient {
    async fn fetch(&self, endpoint: &str, query: &Query) -> Result<serde_json::Value, ToolError> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            ToolError::Config(format!("TAAPI secret missing (set {})", self.secret_env))
        })?;

        debug!(endpoint, params = query.len(), "Querying TAAPI");

        let response = self
            .client
            .get(self.url(endpoint))
            .query(&[("secret", secret)])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint, status = %status, "TAAPI request failed");
            return Err(ToolError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| ToolError::Payload {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TaapiClient {
        TaapiClient::new(&server.uri(), Some("s3cret".to_string()), Duration::from_secs(5)).unwrap()
    }

    fn btc_query() -> Query {
        vec![
            ("exchange".to_string(), "binance".to_string()),
            ("symbol".to_string(), "BTC/USDT".to_string()),
            ("interval".to_string(), "1h".to_string()),
        ]
    }

    #[test]
    fn url_strips_trailing_slash() {
        let client = TaapiClient::new("https://api.taapi.io/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(client.url("pivotpoints"), "https://api.taapi.io/pivotpoints");
    }

    #[tokio::test]
    async fn missing_secret_fails_before_any_request() {
        let client = TaapiClient::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        let err = client.fetch("engulfing", &Vec::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));
        assert!(err.to_string().contains("TAAPI_KEY"));
    }

    #[tokio::test]
    async fn fetch_sends_secret_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/engulfing"))
            .and(query_param("secret", "s3cret"))
            .and(query_param("symbol", "BTC/USDT"))
            .and(query_param("interval", "1h"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 100})))
            .mount(&server)
            .await;

        let body = client(&server).fetch("engulfing", &btc_query()).await.unwrap();
        assert_eq!(body, json!({"value": 100}));
    }

    #[tokio::test]
    async fn error_status_keeps_endpoint_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/morningstar"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid secret"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch("morningstar", &btc_query())
            .await
            .unwrap_err();
        match err {
            ToolError::Status {
                endpoint,
                status,
                body,
            } => {
                assert_eq!(endpoint, "morningstar");
                assert_eq!(status, 401);
                assert_eq!(body, "invalid secret");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_a_payload_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pivotpoints"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch("pivotpoints", &btc_query())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Payload { ref endpoint, .. } if endpoint == "pivotpoints"));
    }
}
