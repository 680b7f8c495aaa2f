//! Domain types for wallet risk analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wei per ether, used to express transaction values in ETH
pub const WEI_PER_ETH: f64 = 1e18;

/// Risk indicator codes at or below this value denote sanctions or critical severity
pub const CRITICAL_INDICATOR_CODE: u32 = 5004;

// ============================================================================
// COLLABORATOR SNAPSHOTS
// ============================================================================

/// A single transaction as observed on-chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservedTransaction {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub value_wei: u128,
    pub gas_price_wei: u128,
    pub gas_used: u64,
    pub is_error: bool,
}

/// Snapshot of a wallet's on-chain activity, taken once per analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletObservation {
    pub address: String,
    pub transaction_count: u64,
    pub first_transaction_at: Option<DateTime<Utc>>,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub balance_wei: u128,
    /// Ordered oldest first
    pub transactions: Vec<ObservedTransaction>,
}

impl WalletObservation {
    /// Build an observation from an unordered transaction list.
    ///
    /// Transactions are sorted by timestamp; count and first/last timestamps
    /// are derived from the sorted list.
    #[must_use]
    pub fn from_transactions(
        address: impl Into<String>,
        balance_wei: u128,
        mut transactions: Vec<ObservedTransaction>,
    ) -> Self {
        transactions.sort_by_key(|tx| tx.timestamp);
        Self {
            address: address.into(),
            transaction_count: transactions.len() as u64,
            first_transaction_at: transactions.first().map(|tx| tx.timestamp),
            last_transaction_at: transactions.last().map(|tx| tx.timestamp),
            balance_wei,
            transactions,
        }
    }

    /// An observation for an address with no history and no balance.
    #[must_use]
    pub fn empty(address: impl Into<String>) -> Self {
        Self::from_transactions(address, 0, Vec::new())
    }

    /// Whole days between the first transaction and `now`.
    ///
    /// Returns 0 when there is no first transaction or it lies in the future.
    #[must_use]
    pub fn wallet_age_days(&self, now: DateTime<Utc>) -> u64 {
        self.first_transaction_at
            .map(|first| (now - first).num_days().max(0) as u64)
            .unwrap_or(0)
    }

    /// Mean transaction value in ETH, 0 when there are no transactions.
    #[must_use]
    pub fn average_transaction_value(&self) -> f64 {
        if self.transactions.is_empty() {
            return 0.0;
        }
        let total_wei: f64 = self.transactions.iter().map(|tx| tx.value_wei as f64).sum();
        total_wei / self.transactions.len() as f64 / WEI_PER_ETH
    }
}

/// Behavioral anomaly flags derived from a wallet observation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BehaviorPattern {
    pub rapid_transactions: bool,
    pub suspicious_gas_usage: bool,
    pub unusual_amounts: bool,
}

/// A coded compliance flag reported by the AML provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskIndicator {
    pub code: u32,
    pub name: String,
    /// Identifier (usually an address) of the entity that triggered the flag
    pub source: String,
}

impl RiskIndicator {
    #[must_use]
    pub fn new(code: u32, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.code <= CRITICAL_INDICATOR_CODE
    }
}

/// AML provider verdict for an address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmlResult {
    /// Raw provider score on a 0-10 scale
    pub score: f64,
    pub indicators: Vec<RiskIndicator>,
}

// ============================================================================
// RISK FACTORS
// ============================================================================

/// How often a wallet transacts, relative to its age
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionFrequency {
    #[serde(rename = "None")]
    None,
    #[serde(rename = "N/A")]
    NotApplicable,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl TransactionFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::NotApplicable => "N/A",
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }
}

impl std::fmt::Display for TransactionFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletAgeFactor {
    pub age_in_days: u64,
    pub first_seen: Option<DateTime<Utc>>,
    pub score: u8,
    pub weight: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionHistoryFactor {
    pub total_transactions: u64,
    /// Mean value in ETH
    pub average_transaction_value: f64,
    pub last_transaction: Option<DateTime<Utc>>,
    pub transaction_frequency: TransactionFrequency,
    pub score: u8,
    pub weight: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressReputationFactor {
    pub is_contract: bool,
    /// Reserved, always false
    pub has_blacklist_interactions: bool,
    /// Reserved, always false
    pub known_malicious_activity: bool,
    pub score: u8,
    pub weight: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehaviorPatternsFactor {
    pub rapid_transactions: bool,
    pub suspicious_gas_usage: bool,
    pub unusual_amounts: bool,
    pub score: u8,
    pub weight: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmlComplianceFactor {
    /// Raw provider score on a 0-10 scale
    pub provider_score: f64,
    pub risk_indicators: Vec<RiskIndicator>,
    pub score: u8,
    pub weight: f64,
    pub description: String,
}

/// Per-dimension breakdown of a risk analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactors {
    pub wallet_age: WalletAgeFactor,
    pub transaction_history: TransactionHistoryFactor,
    pub address_reputation: AddressReputationFactor,
    pub behavior_patterns: BehaviorPatternsFactor,
    /// Present only when the AML provider returned data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aml_compliance: Option<AmlComplianceFactor>,
}

impl RiskFactors {
    /// `(score, weight)` pairs of every present factor.
    pub fn weighted_scores(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        [
            (self.wallet_age.score, self.wallet_age.weight),
            (self.transaction_history.score, self.transaction_history.weight),
            (self.address_reputation.score, self.address_reputation.weight),
            (self.behavior_patterns.score, self.behavior_patterns.weight),
        ]
        .into_iter()
        .chain(self.aml_compliance.as_ref().map(|aml| (aml.score, aml.weight)))
    }
}

// ============================================================================
// RISK ANALYSIS
// ============================================================================

/// Discrete risk classification of a composite score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a composite score to a level: >= 80 critical, >= 60 high, >= 30 medium.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => Self::Critical,
            60..=79 => Self::High,
            30..=59 => Self::Medium,
            _ => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid risk level: {}", s)),
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Complete, explainable risk assessment of one wallet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAnalysis {
    /// Lower-cased address
    pub wallet_address: String,
    /// Composite score in [0, 100]
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub factors: RiskFactors,
    /// Ordered, most important first
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub cache_expiry: DateTime<Utc>,
}
