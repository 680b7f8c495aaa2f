//! Risk aggregation: assembles factor breakdowns and the composite score.

use chrono::{DateTime, Utc};

use super::scoring;
use crate::domain::{
    AddressReputationFactor, AmlComplianceFactor, AmlResult, BehaviorPattern,
    BehaviorPatternsFactor, RiskFactors, RiskLevel, TransactionHistoryFactor, WalletAgeFactor,
    WalletObservation,
};

/// Fixed factor weights. With AML data present they sum to 1.0.
pub mod weights {
    pub const WALLET_AGE: f64 = 0.20;
    pub const TRANSACTION_HISTORY: f64 = 0.25;
    pub const ADDRESS_REPUTATION: f64 = 0.15;
    pub const BEHAVIOR_PATTERNS: f64 = 0.10;
    pub const AML_COMPLIANCE: f64 = 0.30;
}

/// AML verdict together with the provider's description of it
#[derive(Debug, Clone, Copy)]
pub struct AmlAssessment<'a> {
    pub result: &'a AmlResult,
    pub description: &'a str,
}

/// Everything the factor calculators consume for one analysis
#[derive(Debug, Clone, Copy)]
pub struct FactorInputs<'a> {
    pub observation: &'a WalletObservation,
    pub is_contract: bool,
    pub patterns: &'a BehaviorPattern,
    pub aml: Option<AmlAssessment<'a>>,
    pub now: DateTime<Utc>,
}

/// Score every dimension. The AML factor is omitted when no AML data exists.
#[must_use]
pub fn calculate_risk_factors(inputs: FactorInputs<'_>) -> RiskFactors {
    let observation = inputs.observation;

    let age_in_days = observation.wallet_age_days(inputs.now);
    let average_value = observation.average_transaction_value();
    let transaction_count = observation.transaction_count;

    RiskFactors {
        wallet_age: WalletAgeFactor {
            age_in_days,
            first_seen: observation.first_transaction_at,
            score: scoring::wallet_age_score(age_in_days),
            weight: weights::WALLET_AGE,
            description: scoring::wallet_age_description(age_in_days).to_string(),
        },
        transaction_history: TransactionHistoryFactor {
            total_transactions: transaction_count,
            average_transaction_value: average_value,
            last_transaction: observation.last_transaction_at,
            transaction_frequency: scoring::transaction_frequency(transaction_count, age_in_days),
            score: scoring::transaction_score(transaction_count, average_value),
            weight: weights::TRANSACTION_HISTORY,
            description: scoring::transaction_description(transaction_count).to_string(),
        },
        address_reputation: AddressReputationFactor {
            is_contract: inputs.is_contract,
            has_blacklist_interactions: false,
            known_malicious_activity: false,
            score: scoring::reputation_score(
                inputs.is_contract,
                observation.balance_wei,
                transaction_count,
            ),
            weight: weights::ADDRESS_REPUTATION,
            description: scoring::reputation_description(inputs.is_contract).to_string(),
        },
        behavior_patterns: BehaviorPatternsFactor {
            rapid_transactions: inputs.patterns.rapid_transactions,
            suspicious_gas_usage: inputs.patterns.suspicious_gas_usage,
            unusual_amounts: inputs.patterns.unusual_amounts,
            score: scoring::behavior_score(inputs.patterns),
            weight: weights::BEHAVIOR_PATTERNS,
            description: scoring::behavior_description(inputs.patterns),
        },
        aml_compliance: inputs.aml.map(|aml| AmlComplianceFactor {
            provider_score: aml.result.score,
            risk_indicators: aml.result.indicators.clone(),
            score: scoring::aml_score(aml.result.score),
            weight: weights::AML_COMPLIANCE,
            description: aml.description.to_string(),
        }),
    }
}

/// Weighted sum of present factor scores, rounded to the nearest integer.
///
/// Weights are not renormalized when the AML factor is absent, so the
/// ceiling without AML data is 70.
#[must_use]
pub fn composite_score(factors: &RiskFactors) -> u8 {
    let weighted: f64 = factors
        .weighted_scores()
        .map(|(score, weight)| f64::from(score) * weight)
        .sum();
    weighted.round().clamp(0.0, 100.0) as u8
}

/// Composite score and its discrete level.
#[must_use]
pub fn aggregate(factors: &RiskFactors) -> (u8, RiskLevel) {
    let score = composite_score(factors);
    (score, RiskLevel::from_score(score))
}
