//! Score calculators.
//!
//! Each calculator maps one observed metric to a 0-100 risk score, higher
//! meaning riskier. Breakpoints are fixed; boundaries are strict unless noted.

use crate::domain::{BehaviorPattern, TransactionFrequency};

/// Wallet age in days: brand-new and empty wallets score highest.
#[must_use]
pub fn wallet_age_score(age_in_days: u64) -> u8 {
    match age_in_days {
        0 => 100,
        1..=6 => 80,
        7..=29 => 60,
        30..=89 => 40,
        90..=179 => 20,
        _ => 10,
    }
}

/// Transaction history score.
///
/// The average value is accepted for future weighting but does not
/// currently influence the score.
#[must_use]
pub fn transaction_score(transaction_count: u64, _average_value: f64) -> u8 {
    match transaction_count {
        0 => 100,
        1..=4 => 70,
        5..=19 => 50,
        20..=49 => 30,
        _ => 15,
    }
}

/// Address reputation score.
///
/// A drained wallet (zero balance after some activity) is a common
/// throwaway signature.
#[must_use]
pub fn reputation_score(is_contract: bool, balance_wei: u128, transaction_count: u64) -> u8 {
    let mut score: u32 = 0;
    if is_contract {
        score += 30;
    }
    if balance_wei == 0 && transaction_count > 0 {
        score += 20;
    }
    score.min(100) as u8
}

#[must_use]
pub fn behavior_score(patterns: &BehaviorPattern) -> u8 {
    let mut score: u32 = 0;
    if patterns.rapid_transactions {
        score += 40;
    }
    if patterns.suspicious_gas_usage {
        score += 30;
    }
    if patterns.unusual_amounts {
        score += 30;
    }
    score.min(100) as u8
}

/// Map the provider's 0-10 AML score onto 0-100 (inclusive lower bounds).
#[must_use]
pub fn aml_score(provider_score: f64) -> u8 {
    if provider_score >= 8.0 {
        100
    } else if provider_score >= 6.0 {
        85
    } else if provider_score >= 4.0 {
        60
    } else if provider_score >= 2.0 {
        35
    } else {
        10
    }
}

// ============================================================================
// DESCRIPTIONS
// ============================================================================

#[must_use]
pub fn wallet_age_description(age_in_days: u64) -> &'static str {
    match age_in_days {
        0 => "No transaction history",
        1..=6 => "Very new wallet (< 1 week)",
        7..=29 => "New wallet (< 1 month)",
        30..=89 => "Relatively new (< 3 months)",
        90..=179 => "Established wallet (< 6 months)",
        _ => "Mature wallet (> 6 months)",
    }
}

#[must_use]
pub fn transaction_description(transaction_count: u64) -> &'static str {
    match transaction_count {
        0 => "No transactions",
        1..=4 => "Very limited activity",
        5..=19 => "Limited activity",
        20..=49 => "Moderate activity",
        _ => "Active wallet",
    }
}

#[must_use]
pub fn reputation_description(is_contract: bool) -> &'static str {
    if is_contract {
        "Smart contract address"
    } else {
        "Standard EOA (Externally Owned Account)"
    }
}

#[must_use]
pub fn behavior_description(patterns: &BehaviorPattern) -> String {
    let issues: Vec<&str> = [
        (patterns.rapid_transactions, "rapid transactions"),
        (patterns.suspicious_gas_usage, "unusual gas usage"),
        (patterns.unusual_amounts, "suspicious amounts"),
    ]
    .into_iter()
    .filter_map(|(flagged, label)| flagged.then_some(label))
    .collect();

    if issues.is_empty() {
        "Normal behavior patterns".to_string()
    } else {
        format!("Suspicious patterns: {}", issues.join(", "))
    }
}

/// Transactions per day over the wallet's lifetime.
#[must_use]
pub fn transaction_frequency(transaction_count: u64, age_in_days: u64) -> TransactionFrequency {
    if transaction_count == 0 {
        return TransactionFrequency::None;
    }
    if age_in_days == 0 {
        return TransactionFrequency::NotApplicable;
    }

    let per_day = transaction_count as f64 / age_in_days as f64;
    if per_day > 10.0 {
        TransactionFrequency::VeryHigh
    } else if per_day > 5.0 {
        TransactionFrequency::High
    } else if per_day > 1.0 {
        TransactionFrequency::Moderate
    } else {
        TransactionFrequency::Low
    }
}
