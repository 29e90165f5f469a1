use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::dto::Ticker;
use crate::supply::TokenSupplyRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    Unavailable(String),
    #[error("no token data for {0}")]
    NotFound(String),
}

/// Source of raw token fields, keyed by ticker.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token_info(&self, ticker: &Ticker) -> Result<TokenSupplyRecord, ClientError>;
}

/// Only `result[0]` is decoded, so malformed trailing entries are ignored.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

/// Client for the Kasplex KRC-20 token endpoint.
#[derive(Clone)]
pub struct KasplexClient {
    client: reqwest::Client,
    base_url: String,
}

impl KasplexClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn token_url(&self, ticker: &Ticker) -> String {
        format!("{}/{}", self.base_url, ticker)
    }
}

#[async_trait]
impl TokenSource for KasplexClient {
    async fn token_info(&self, ticker: &Ticker) -> Result<TokenSupplyRecord, ClientError> {
        let url = self.token_url(ticker);
        tracing::debug!("Fetching token data from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("Request to {} failed: {}", url, e);
            if e.is_timeout() {
                ClientError::Unavailable("upstream request timed out".to_string())
            } else {
                ClientError::Unavailable("upstream request failed".to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Upstream answered {} for {}", status, url);
            return Err(ClientError::Unavailable(format!(
                "upstream returned status {}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            tracing::warn!("Invalid upstream body for {}: {}", url, e);
            ClientError::Unavailable("upstream returned an invalid body".to_string())
        })?;

        let first = body
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(ticker.to_string()))?;

        serde_json::from_value(first).map_err(|e| {
            tracing::warn!("Invalid token record for {}: {}", ticker, e);
            ClientError::Unavailable("upstream returned an invalid token record".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::supply::{self, RawAmount, SupplyError};

    fn client(server: &MockServer, timeout: Duration) -> KasplexClient {
        KasplexClient::new(&format!("{}/v1/krc20/token/", server.base_url()), timeout).unwrap()
    }

    fn nacho() -> Ticker {
        Ticker::parse("nacho").unwrap()
    }

    #[tokio::test]
    async fn test_fetches_first_result() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/krc20/token/NACHO");
                then.status(200).json_body(json!({
                    "message": "successful",
                    "result": [{
                        "tick": "NACHO",
                        "max": "28700000000000000000",
                        "minted": "28700000000000000000",
                        "pre": "0",
                        "dec": "8",
                        "state": "finished"
                    }]
                }));
            })
            .await;

        let record = client(&server, Duration::from_secs(10))
            .token_info(&nacho())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(record.tick.as_deref(), Some("NACHO"));
        assert_eq!(record.max, Some(RawAmount::from("28700000000000000000")));
        assert_eq!(record.burned, None);
    }

    #[tokio::test]
    async fn test_empty_result_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/krc20/token/NACHO");
                then.status(200).json_body(json!({ "message": "successful", "result": [] }));
            })
            .await;

        let err = client(&server, Duration::from_secs(10))
            .token_info(&nacho())
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::NotFound("NACHO".to_string()));
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/krc20/token/NACHO");
                then.status(503);
            })
            .await;

        let err = client(&server, Duration::from_secs(10))
            .token_info(&nacho())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Unavailable("upstream returned status 503".to_string())
        );
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/krc20/token/NACHO");
                then.status(200)
                    .delay(Duration::from_secs(2))
                    .json_body(json!({ "result": [] }));
            })
            .await;

        let err = client(&server, Duration::from_millis(200))
            .token_info(&nacho())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Unavailable("upstream request timed out".to_string())
        );
    }

    #[tokio::test]
    async fn test_non_numeric_fields_reach_the_calculator() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/krc20/token/NACHO");
                then.status(200)
                    .json_body(json!({ "result": [{ "max": true, "pre": "0" }] }));
            })
            .await;

        let record = client(&server, Duration::from_secs(10))
            .token_info(&nacho())
            .await
            .unwrap();

        assert_eq!(record.max, Some(RawAmount::Other(json!(true))));
        assert!(matches!(
            supply::compute(&record),
            Err(SupplyError::InvalidField { field: "max", .. })
        ));
    }

    #[tokio::test]
    async fn test_negative_dec_and_bad_trailing_entries() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/krc20/token/NACHO");
                then.status(200).json_body(json!({
                    "result": [
                        { "max": "1000", "pre": "0", "dec": -1 },
                        "not a record",
                        { "max": [1, 2, 3] }
                    ]
                }));
            })
            .await;

        let record = client(&server, Duration::from_secs(10))
            .token_info(&nacho())
            .await
            .unwrap();

        assert_eq!(record.dec, Some(RawAmount::Other(json!(-1))));
        assert_eq!(
            supply::compute(&record),
            Err(SupplyError::InvalidField {
                field: "dec",
                value: "-1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_non_object_record_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/krc20/token/NACHO");
                then.status(200).json_body(json!({ "result": ["NACHO"] }));
            })
            .await;

        let err = client(&server, Duration::from_secs(10))
            .token_info(&nacho())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Unavailable("upstream returned an invalid token record".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/krc20/token/NACHO");
                then.status(200).body("<html>oops</html>");
            })
            .await;

        let err = client(&server, Duration::from_secs(10))
            .token_info(&nacho())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Unavailable(_)));
    }
}
