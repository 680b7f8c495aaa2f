//! Domain traits defining contracts for external systems.

use async_trait::async_trait;

use super::error::AppError;
use super::types::{AmlResult, BehaviorPattern, RiskIndicator, WalletObservation};

/// On-chain data source for wallet history, balance and code lookups
#[async_trait]
pub trait OnChainDataSource: Send + Sync {
    /// Fetch a snapshot of the wallet's transactions and balance
    async fn fetch_observation(&self, address: &str) -> Result<WalletObservation, AppError>;

    /// Check whether the address holds contract code
    async fn is_contract(&self, address: &str) -> Result<bool, AppError>;

    /// Derive behavioral anomaly flags from an observation
    fn detect_patterns(&self, observation: &WalletObservation) -> BehaviorPattern;
}

/// AML compliance provider
#[async_trait]
pub trait AmlProvider: Send + Sync {
    /// Look up the AML verdict for an address on the given chain.
    ///
    /// `Ok(None)` means the provider has no data for this address, which is
    /// a valid outcome and not an error.
    async fn fetch_aml_result(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<Option<AmlResult>, AppError>;

    /// Whether the indicators warrant blocking the wallet outright.
    ///
    /// Default: any critical indicator (code <= 5004).
    fn should_auto_block(&self, indicators: &[RiskIndicator]) -> bool {
        indicators.iter().any(RiskIndicator::is_critical)
    }

    /// Human-readable summary of an AML verdict
    fn describe_aml(&self, score: f64, indicators: &[RiskIndicator]) -> String {
        let severity = if score >= 8.0 {
            "Critical"
        } else if score >= 6.0 {
            "High"
        } else if score >= 4.0 {
            "Medium"
        } else if score >= 2.0 {
            "Low"
        } else {
            "Minimal"
        };

        let mut description = format!("AML risk score {}/10 ({} risk)", score, severity);
        if !indicators.is_empty() {
            let names: Vec<&str> = indicators.iter().map(|i| i.name.as_str()).collect();
            description.push_str(" - indicators: ");
            description.push_str(&names.join(", "));
        }
        description
    }
}
