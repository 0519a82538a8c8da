//! Route aggregator transport
//!
//! [`Aggregator`] is the seam between the pipeline and the external routing
//! service; [`JupiterClient`] speaks the Jupiter v6 HTTP API. The client is
//! cheap to clone and owns no mutable state, so one instance can be shared by
//! any number of concurrent sessions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::AggregatorConfig;
use crate::errors::{SwapError, SwapResult};

/// Query parameters for the quote endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteParams<'a> {
    pub input_mint: &'a str,
    pub output_mint: &'a str,
    pub amount: u64,
    pub slippage_bps: u16,
}

/// Body for the swap-build endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest<'a> {
    /// Raw quote body exactly as the aggregator returned it
    pub quote_response: &'a Value,
    pub user_public_key: String,
    #[serde(rename = "wrapAndUnwrapSol")]
    pub wrap_and_unwrap_sol: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    /// Base64 encoded unsigned versioned transaction
    pub swap_transaction: String,
    #[serde(default)]
    pub last_valid_block_height: Option<u64>,
}

/// External route aggregator
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Fetch a quote; returns the raw response body for validation upstream.
    /// Transport failures and non-success statuses map to
    /// [`SwapError::Transport`], undecodable bodies to [`SwapError::QuoteMalformed`].
    async fn quote(&self, params: &QuoteParams<'_>) -> SwapResult<Value>;

    /// Build an unsigned swap transaction for a previously fetched quote.
    /// Every failure maps to [`SwapError::BuildFailed`].
    async fn build_swap(&self, request: &BuildRequest<'_>) -> SwapResult<BuildResponse>;
}

/// Jupiter v6 HTTP client
#[derive(Debug, Clone)]
pub struct JupiterClient {
    http: reqwest::Client,
    base_url: String,
}

impl JupiterClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn from_config(config: &AggregatorConfig) -> SwapResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SwapError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self::new(http, config.base_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Aggregator for JupiterClient {
    #[instrument(skip(self), fields(amount = params.amount))]
    async fn quote(&self, params: &QuoteParams<'_>) -> SwapResult<Value> {
        let url = format!("{}/quote", self.base_url);
        let query = [
            ("inputMint", params.input_mint.to_string()),
            ("outputMint", params.output_mint.to_string()),
            ("amount", params.amount.to_string()),
            ("slippageBps", params.slippage_bps.to_string()),
        ];

        let response = self.http.get(&url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Quote request rejected");
            return Err(SwapError::Transport {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SwapError::QuoteMalformed(format!("undecodable body: {}", e)))
    }

    #[instrument(skip(self, request), fields(user = %request.user_public_key))]
    async fn build_swap(&self, request: &BuildRequest<'_>) -> SwapResult<BuildResponse> {
        let url = format!("{}/swap", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| SwapError::BuildFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwapError::BuildFailed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let built: BuildResponse = response
            .json()
            .await
            .map_err(|e| SwapError::BuildFailed(format!("undecodable body: {}", e)))?;
        if built.swap_transaction.is_empty() {
            return Err(SwapError::BuildFailed("empty swapTransaction".to_string()));
        }
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{SOL_MINT, USDC_MINT};
    use mockito::Matcher;
    use serde_json::json;

    fn params() -> QuoteParams<'static> {
        QuoteParams {
            input_mint: SOL_MINT,
            output_mint: USDC_MINT,
            amount: 1_500_000_000,
            slippage_bps: 50,
        }
    }

    #[tokio::test]
    async fn test_quote_sends_expected_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/quote")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("inputMint".into(), SOL_MINT.into()),
                Matcher::UrlEncoded("outputMint".into(), USDC_MINT.into()),
                Matcher::UrlEncoded("amount".into(), "1500000000".into()),
                Matcher::UrlEncoded("slippageBps".into(), "50".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"inAmount": "1500000000", "outAmount": "150000000"}).to_string())
            .create_async()
            .await;

        let client = JupiterClient::new(reqwest::Client::new(), format!("{}/", server.url()));
        let body = client.quote(&params()).await.unwrap();

        assert_eq!(body["outAmount"], "150000000");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_quote_status_error_is_transport() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = JupiterClient::new(reqwest::Client::new(), server.url());
        match client.quote(&params()).await {
            Err(SwapError::Transport { status, message }) => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_quote_garbage_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/quote")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = JupiterClient::new(reqwest::Client::new(), server.url());
        assert!(matches!(
            client.quote(&params()).await,
            Err(SwapError::QuoteMalformed(_))
        ));
    }

    #[tokio::test]
    async fn test_build_posts_quote_and_user() {
        let mut server = mockito::Server::new_async().await;
        let quote_body = json!({"inAmount": "10", "outAmount": "20", "routePlan": []});
        let mock = server
            .mock("POST", "/swap")
            .match_body(Matcher::PartialJson(json!({
                "quoteResponse": {"inAmount": "10", "outAmount": "20"},
                "userPublicKey": "Wallet1111",
                "wrapAndUnwrapSol": true
            })))
            .with_status(200)
            .with_body(json!({"swapTransaction": "AQID", "lastValidBlockHeight": 777}).to_string())
            .create_async()
            .await;

        let client = JupiterClient::new(reqwest::Client::new(), server.url());
        let built = client
            .build_swap(&BuildRequest {
                quote_response: &quote_body,
                user_public_key: "Wallet1111".into(),
                wrap_and_unwrap_sol: true,
            })
            .await
            .unwrap();

        assert_eq!(built.swap_transaction, "AQID");
        assert_eq!(built.last_valid_block_height, Some(777));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_build_rejection_is_build_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/swap")
            .with_status(400)
            .with_body("route expired")
            .create_async()
            .await;

        let client = JupiterClient::new(reqwest::Client::new(), server.url());
        let quote_body = json!({});
        let err = client
            .build_swap(&BuildRequest {
                quote_response: &quote_body,
                user_public_key: "Wallet1111".into(),
                wrap_and_unwrap_sol: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::BuildFailed(ref m) if m.contains("400")));
    }
}
