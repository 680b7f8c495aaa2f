//! MetaSleuth AML provider implementation.
//!
//! This module provides integration with MetaSleuth's address compliance
//! API for AML risk scoring of wallet addresses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{AmlProvider, AmlResult, AppError, ExternalServiceError, RiskIndicator};

/// Default MetaSleuth API base URL
pub const DEFAULT_METASLEUTH_API_URL: &str = "https://aml.blocksec.com/address-compliance/api/v3";

/// Application-level success code in MetaSleuth responses
pub const METASLEUTH_SUCCESS_CODE: i64 = 200000;

/// Upper bound of the provider's risk scale
const MAX_PROVIDER_SCORE: f64 = 10.0;

#[derive(Debug, Serialize)]
struct RiskScoreRequest<'a> {
    chain_id: u64,
    address: &'a str,
}

/// Response from the MetaSleuth risk-score API
#[derive(Debug, Deserialize)]
pub struct RiskScoreResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<RiskScoreData>,
}

#[derive(Debug, Deserialize)]
pub struct RiskScoreData {
    #[serde(default)]
    pub address: Option<String>,
    pub risk_score: f64,
    #[serde(default)]
    pub risk_indicators: Option<Vec<IndicatorEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct IndicatorEntry {
    pub indicator: IndicatorInfo,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IndicatorInfo {
    pub code: u32,
    pub name: String,
}

impl RiskScoreData {
    /// Validate the provider payload and convert it into the domain result
    pub fn into_aml_result(self) -> Result<AmlResult, AppError> {
        if !self.risk_score.is_finite() || !(0.0..=MAX_PROVIDER_SCORE).contains(&self.risk_score) {
            return Err(AppError::ExternalService(ExternalServiceError::ParseError(
                format!("risk_score out of range: {}", self.risk_score),
            )));
        }

        let indicators = self
            .risk_indicators
            .unwrap_or_default()
            .into_iter()
            .map(|entry| RiskIndicator {
                code: entry.indicator.code,
                name: entry.indicator.name,
                source: entry.source.unwrap_or_default(),
            })
            .collect();

        Ok(AmlResult {
            score: self.risk_score,
            indicators,
        })
    }
}

/// AML provider that screens addresses via the MetaSleuth API
#[derive(Debug, Clone)]
pub struct MetaSleuthProvider {
    http_client: Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl MetaSleuthProvider {
    /// Create a new MetaSleuth provider
    ///
    /// # Arguments
    /// * `api_key` - Optional API key. If None, no AML data is ever returned.
    /// * `base_url` - Optional custom API base URL. Defaults to MetaSleuth production.
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

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_METASLEUTH_API_URL.to_string()),
        })
    }

    /// Check if running without an API key
    pub fn is_mock_mode(&self) -> bool {
        self.api_key.is_none()
    }

    async fn request_risk_score(
        &self,
        api_key: &SecretString,
        address: &str,
        chain_id: u64,
    ) -> Result<RiskScoreResponse, AppError> {
        let url = format!("{}/risk-score", self.base_url);

        debug!(url = %url, address = %address, chain_id, "Calling MetaSleuth risk API");

        let response = self
            .http_client
            .post(&url)
            .header("API-KEY", api_key.expose_secret())
            .json(&RiskScoreRequest { chain_id, address })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "MetaSleuth API request failed");
                if e.is_timeout() {
                    AppError::ExternalService(ExternalServiceError::Timeout(e.to_string()))
                } else {
                    AppError::ExternalService(ExternalServiceError::Network(e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "MetaSleuth API returned error");
            return Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: status.as_u16(),
                message: body,
            }));
        }

        response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse MetaSleuth response");
            AppError::ExternalService(ExternalServiceError::ParseError(e.to_string()))
        })
    }
}

#[async_trait]
impl AmlProvider for MetaSleuthProvider {
    #[instrument(skip(self), fields(address = %address, chain_id = chain_id))]
    async fn fetch_aml_result(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Option<AmlResult>, AppError> {
        let Some(api_key) = &self.api_key else {
            warn!("No METASLEUTH_API_KEY configured - AML data unavailable");
            return Ok(None);
        };

        let response = self.request_risk_score(api_key, address, chain_id).await?;

        if response.code != METASLEUTH_SUCCESS_CODE {
            warn!(
                code = response.code,
                message = response.message.as_deref().unwrap_or_default(),
                "MetaSleuth returned no risk data"
            );
            return Ok(None);
        }

        let Some(data) = response.data else {
            debug!(address = %address, "MetaSleuth response carried no data");
            return Ok(None);
        };

        let result = data.into_aml_result()?;
        info!(
            address = %address,
            risk_score = result.score,
            indicators = result.indicators.len(),
            "MetaSleuth risk check complete"
        );
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_mode_returns_no_data() {
        let provider = MetaSleuthProvider::new(None, None, Duration::from_secs(5)).unwrap();
        assert!(provider.is_mock_mode());

        let result = provider.fetch_aml_result("0xabc", 84532).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_payload_conversion() {
        let data: RiskScoreData = serde_json::from_value(json!({
            "address": "0xabc",
            "risk_score": 9,
            "risk_indicators": [
                {
                    "indicator": { "code": 5001, "name": "Sanctioned Entity" },
                    "source": "0x098b716b8aaf21512996dc57eb0615e2383e2f96"
                },
                {
                    "indicator": { "code": 5100, "name": "Mixer" },
                    "source": null
                }
            ]
        }))
        .unwrap();

        let result = data.into_aml_result().unwrap();
        assert_eq!(result.score, 9.0);
        assert_eq!(result.indicators.len(), 2);
        assert_eq!(result.indicators[0].code, 5001);
        assert!(result.indicators[0].is_critical());
        assert_eq!(result.indicators[1].source, "");
    }

    #[test]
    fn test_null_indicators_are_empty() {
        let data: RiskScoreData = serde_json::from_value(json!({
            "risk_score": 0,
            "risk_indicators": null
        }))
        .unwrap();
        assert!(data.into_aml_result().unwrap().indicators.is_empty());
    }

    #[test]
    fn test_out_of_range_score_is_rejected() {
        let data: RiskScoreData = serde_json::from_value(json!({ "risk_score": 42 })).unwrap();
        let err = data.into_aml_result().unwrap_err();
        assert!(matches!(
            err,
            AppError::ExternalService(ExternalServiceError::ParseError(_))
        ));
    }

    #[test]
    fn test_default_policy_helpers() {
        let provider = MetaSleuthProvider::new(None, None, Duration::from_secs(5)).unwrap();
        assert!(provider.should_auto_block(&[RiskIndicator::new(5004, "Sanctions", "0x1")]));
        assert!(!provider.should_auto_block(&[RiskIndicator::new(5005, "Mixer", "0x1")]));
        assert_eq!(
            provider.describe_aml(8.0, &[]),
            "AML risk score 8/10 (Critical risk)"
        );
    }
}
