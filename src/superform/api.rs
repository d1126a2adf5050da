//! Superform quote-service HTTP client
//!
//! Two quoting flows translate high-level intents into router calldata: a
//! deposit-start POST and a rewards-claim GET, plus the two-step
//! calculate/start pair used for route-fetched withdrawals. Every flow is a
//! single request; failures surface to the caller untouched.

use async_trait::async_trait;
use ethers::types::{Address, Bytes};
use ethers::utils::to_checksum;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::DEFAULT_API_URL;
use crate::error::{Error, Result};
use crate::superform::deposit::DepositRouteRequest;
use crate::superform::rewards::ClaimTransaction;
use crate::superform::withdraw::WithdrawRouteRequest;

/// Header carrying the quote-service API key
pub const API_KEY_HEADER: &str = "SF-API-KEY";

/// A ready-to-submit transaction computed by the quote service
#[derive(Debug, Clone, Deserialize)]
pub struct RouteTransaction {
    /// Contract the calldata is destined for
    pub to: Address,
    /// Router method the calldata invokes
    pub method: String,
    /// ABI-encoded router calldata
    pub data: Bytes,
    /// Native value to forward, as a base-10 string
    pub value: String,
}

/// Quote-service boundary; implemented over HTTP in production and by mocks
/// in tests
#[async_trait]
pub trait QuoteApi: Send + Sync {
    /// Quote a deposit route for the given intent
    async fn deposit_start(&self, request: &DepositRouteRequest) -> Result<RouteTransaction>;

    /// Quote a withdraw route: calculate the route, then start it
    async fn withdraw_route(&self, request: &WithdrawRouteRequest) -> Result<RouteTransaction>;

    /// Fetch the pending protocol-rewards claim transaction for `user`
    async fn protocol_rewards_claim(&self, chain_id: u64, user: Address)
        -> Result<ClaimTransaction>;
}

/// HTTP client for the Superform API
pub struct SuperformApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SuperformApi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a non-default deployment of the API
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn require_api_key(&self) -> Result<&str> {
        if self.api_key.is_empty() {
            return Err(Error::Config(
                "superform.api_key (or SF_API_KEY in env) is required".to_string(),
            ));
        }
        Ok(&self.api_key)
    }

    /// Turn a non-2xx response into a transport error carrying status and
    /// best-effort body text; a body-read failure degrades to a placeholder
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("unable to read body: {e}"));
        Err(Error::QuoteService {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("unknown").to_string(),
            body,
        })
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let api_key = self.require_api_key()?;
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("accept", "application/json")
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Some endpoints answer with a bare object, some with a one-element
    /// array; accept both
    fn first_payload<T: serde::de::DeserializeOwned>(
        value: serde_json::Value,
        context: &str,
    ) -> Result<T> {
        let payload = match value {
            serde_json::Value::Array(mut items) => {
                if items.is_empty() {
                    return Err(Error::Deserialization(format!(
                        "{context} response missing payload"
                    )));
                }
                items.swap_remove(0)
            }
            other => other,
        };
        serde_json::from_value(payload)
            .map_err(|e| Error::Deserialization(format!("{context} response: {e}")))
    }
}

#[async_trait]
impl QuoteApi for SuperformApi {
    async fn deposit_start(&self, request: &DepositRouteRequest) -> Result<RouteTransaction> {
        debug!("Requesting deposit route for vault {}", request.vault_id);
        let response = self.post_json("/deposit/start", request).await?;
        let route: RouteTransaction = response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("deposit/start response: {e}")))?;
        Ok(route)
    }

    async fn withdraw_route(&self, request: &WithdrawRouteRequest) -> Result<RouteTransaction> {
        debug!(
            "Calculating withdraw route for superform {}",
            request.superform_id
        );
        // Both endpoints speak one-element arrays
        let response = self.post_json("/withdraw/calculate", &[request]).await?;
        let calculated: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("withdraw/calculate response: {e}")))?;
        let route_plan: serde_json::Value =
            Self::first_payload(calculated, "withdraw/calculate")?;

        let response = self.post_json("/withdraw/start", &[route_plan]).await?;
        let started: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("withdraw/start response: {e}")))?;
        Self::first_payload(started, "withdraw/start")
    }

    async fn protocol_rewards_claim(
        &self,
        chain_id: u64,
        user: Address,
    ) -> Result<ClaimTransaction> {
        let api_key = self.require_api_key()?;
        let url = format!(
            "{}/protocolRewards/claim/{}/{}",
            self.base_url,
            chain_id,
            to_checksum(&user, None)
        );
        debug!("Fetching protocol rewards claim from {url}");

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| Error::Deserialization(format!("protocolRewards/claim response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_route_transaction_parses_typed_fields() {
        let json = r#"{
            "to": "0xa195608C2306A26f727d5199D5A382a4508308DA",
            "method": "singleDirectSingleVaultDeposit",
            "data": "0xb19dcc33",
            "value": "0"
        }"#;
        let route: RouteTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(
            route.to,
            Address::from_str("0xa195608C2306A26f727d5199D5A382a4508308DA").unwrap()
        );
        assert_eq!(route.method, "singleDirectSingleVaultDeposit");
        assert_eq!(route.data.as_ref(), &[0xb1, 0x9d, 0xcc, 0x33]);
        assert_eq!(route.value, "0");
    }

    #[test]
    fn test_route_transaction_rejects_malformed_address() {
        let json = r#"{"to": "0x1234", "method": "m", "data": "0x", "value": "0"}"#;
        assert!(serde_json::from_str::<RouteTransaction>(json).is_err());
    }

    #[test]
    fn test_first_payload_unwraps_arrays() {
        let value = serde_json::json!([{"x": 1}]);
        let payload: serde_json::Value =
            SuperformApi::first_payload(value, "withdraw/start").unwrap();
        assert_eq!(payload, serde_json::json!({"x": 1}));

        let err = SuperformApi::first_payload::<serde_json::Value>(
            serde_json::json!([]),
            "withdraw/start",
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing payload"));
    }

    #[test]
    fn test_missing_api_key_fails_before_any_request() {
        let api = SuperformApi::new("");
        assert!(matches!(api.require_api_key(), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_non_2xx_surfaces_status_and_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let body = "route not found";
            let response = format!(
                "HTTP/1.1 404 Not Found\r\ncontent-length: {}\r\ncontent-type: text/plain\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let api = SuperformApi::new("test-key").with_base_url(format!("http://{addr}"));
        let err = api
            .protocol_rewards_claim(8453, Address::zero())
            .await
            .unwrap_err();

        match err {
            Error::QuoteService {
                status,
                status_text,
                body,
            } => {
                assert_eq!(status, 404);
                assert_eq!(status_text, "Not Found");
                assert_eq!(body, "route not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
