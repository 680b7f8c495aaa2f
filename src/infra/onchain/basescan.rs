//! Basescan (Etherscan-compatible) explorer integration.
//!
//! Provides the on-chain observation used for risk scoring:
//! - Transaction history via `account/txlist`
//! - Native balance via `account/balance`
//! - Contract detection via `proxy/eth_getCode`

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

use super::patterns;
use crate::domain::{
    AppError, BehaviorPattern, ExternalServiceError, ObservedTransaction, OnChainDataSource,
    WalletObservation,
};

/// Default Basescan API base URL (Base Sepolia)
pub const DEFAULT_BASESCAN_API_URL: &str = "https://api-sepolia.basescan.org/api";

/// Message returned with `status: "0"` when an address has no history
const NO_TRANSACTIONS_MESSAGE: &str = "No transactions found";

/// Standard explorer envelope for `account` module calls
#[derive(Debug, Deserialize)]
pub struct ExplorerResponse {
    pub status: String,
    pub message: String,
    pub result: serde_json::Value,
}

/// Envelope for `proxy` module calls (JSON-RPC shaped)
#[derive(Debug, Deserialize)]
pub struct ProxyResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ProxyError>,
    /// Present when the explorer rejects the call before proxying it
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyError {
    pub code: i64,
    pub message: String,
}

/// Transaction row as returned by `account/txlist`. All numbers are strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: String,
    pub time_stamp: String,
    pub value: String,
    pub gas_price: String,
    pub gas_used: String,
    #[serde(default)]
    pub is_error: Option<String>,
}

impl RawTransaction {
    fn into_observed(self) -> Result<ObservedTransaction, AppError> {
        let secs: i64 = parse_number(&self.time_stamp, "timeStamp")?;
        let timestamp = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            parse_error(format!("timeStamp out of range for {}: {}", self.hash, secs))
        })?;

        Ok(ObservedTransaction {
            timestamp,
            value_wei: parse_number(&self.value, "value")?,
            gas_price_wei: parse_number(&self.gas_price, "gasPrice")?,
            gas_used: parse_number(&self.gas_used, "gasUsed")?,
            is_error: self.is_error.as_deref() == Some("1"),
            hash: self.hash,
        })
    }
}

fn parse_error(message: String) -> AppError {
    AppError::ExternalService(ExternalServiceError::ParseError(message))
}

fn parse_number<T: std::str::FromStr>(raw: &str, field: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| parse_error(format!("invalid {}: {:?}", field, raw)))
}

/// On-chain data source backed by the Basescan API
#[derive(Debug, Clone)]
pub struct BasescanClient {
    http_client: Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl BasescanClient {
    /// Create a new Basescan client
    ///
    /// # Arguments
    /// * `api_key` - Optional API key. Without one, requests use the public rate limit.
    /// * `base_url` - Optional custom API base URL. Defaults to Base Sepolia.
    /// * `timeout` - HTTP request timeout
    pub fn new(
        api_key: Option<SecretString>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::ExternalService(ExternalServiceError::Configuration(format!(
                "Failed to create HTTP client: {}",
                e
            )))
        })?;

        if api_key.is_none() {
            warn!("No BASESCAN_API_KEY configured - using public rate limits");
        }

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASESCAN_API_URL.to_string()),
        })
    }

    /// Issue a GET against the explorer and decode the JSON body
    async fn query<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, AppError> {
        debug!(url = %self.base_url, params = ?params, "Calling Basescan API");

        let mut request = self.http_client.get(&self.base_url).query(params);
        if let Some(api_key) = &self.api_key {
            request = request.query(&[("apikey", api_key.expose_secret())]);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Basescan API request failed");
            if e.is_timeout() {
                AppError::ExternalService(ExternalServiceError::Timeout(e.to_string()))
            } else {
                AppError::ExternalService(ExternalServiceError::Network(e.to_string()))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Basescan API returned error");
            return Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: status.as_u16(),
                message: body,
            }));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Basescan response");
            parse_error(e.to_string())
        })
    }

    /// Reject `status: "0"` envelopes, except the empty-history case.
    fn check_envelope(response: &ExplorerResponse, allow_empty: bool) -> Result<bool, AppError> {
        if response.status == "1" {
            return Ok(true);
        }
        if allow_empty && response.message.starts_with(NO_TRANSACTIONS_MESSAGE) {
            return Ok(false);
        }

        let detail = match &response.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Err(AppError::ExternalService(ExternalServiceError::ApiError {
            status_code: 200,
            message: format!("{}: {}", response.message, detail),
        }))
    }

    /// Full transaction history, oldest first
    pub async fn fetch_transactions(
        &self,
        address: &str,
    ) -> Result<Vec<ObservedTransaction>, AppError> {
        let response: ExplorerResponse = self
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "asc"),
            ])
            .await?;

        if !Self::check_envelope(&response, true)? {
            return Ok(Vec::new());
        }

        let rows: Vec<RawTransaction> = serde_json::from_value(response.result)
            .map_err(|e| parse_error(format!("txlist result: {}", e)))?;
        rows.into_iter().map(RawTransaction::into_observed).collect()
    }

    /// Native balance in wei
    pub async fn fetch_balance(&self, address: &str) -> Result<u128, AppError> {
        let response: ExplorerResponse = self
            .query(&[
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;

        Self::check_envelope(&response, false)?;

        match &response.result {
            serde_json::Value::String(raw) => parse_number(raw, "balance"),
            other => Err(parse_error(format!("unexpected balance result: {}", other))),
        }
    }
}

#[async_trait]
impl OnChainDataSource for BasescanClient {
    #[instrument(skip(self), fields(address = %address))]
    async fn fetch_observation(&self, address: &str) -> Result<WalletObservation, AppError> {
        let (transactions, balance_wei) =
            tokio::try_join!(self.fetch_transactions(address), self.fetch_balance(address))?;

        let observation = WalletObservation::from_transactions(address, balance_wei, transactions);
        info!(
            address = %address,
            transaction_count = observation.transaction_count,
            "Fetched on-chain observation"
        );
        Ok(observation)
    }

    #[instrument(skip(self), fields(address = %address))]
    async fn is_contract(&self, address: &str) -> Result<bool, AppError> {
        let response: ProxyResponse = self
            .query(&[
                ("module", "proxy"),
                ("action", "eth_getCode"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;

        if let Some(error) = response.error {
            return Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: 200,
                message: error.message,
            }));
        }

        match response.result {
            Some(serde_json::Value::String(code)) if code.starts_with("0x") => {
                let is_contract = code.len() > 2;
                debug!(address = %address, is_contract, "Contract detection complete");
                Ok(is_contract)
            }
            Some(other) => Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: 200,
                message: format!(
                    "{}: {}",
                    response.message.unwrap_or_default(),
                    other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string())
                ),
            })),
            None => Err(parse_error("eth_getCode response missing result".to_string())),
        }
    }

    fn detect_patterns(&self, observation: &WalletObservation) -> BehaviorPattern {
        patterns::detect_patterns(observation)
    }
}
