//! Behavioral anomaly detection over a wallet's transaction history.

use crate::domain::{BehaviorPattern, ObservedTransaction, WalletObservation};

/// Sliding window for burst detection
pub const RAPID_WINDOW_SECS: i64 = 60 * 60;

/// More than this many transactions inside one window counts as rapid
pub const RAPID_TRANSACTION_THRESHOLD: usize = 10;

/// Gas price above this multiple of the wallet's median is suspicious
pub const GAS_PRICE_MULTIPLIER: u128 = 5;

/// Value above this multiple of the wallet's median successful transfer is unusual
pub const UNUSUAL_VALUE_MULTIPLIER: u128 = 10;

/// Fewer samples than this cannot establish a baseline
pub const MIN_BASELINE_SAMPLES: usize = 3;

/// Derive all behavior flags for an observation.
#[must_use]
pub fn detect_patterns(observation: &WalletObservation) -> BehaviorPattern {
    let transactions = &observation.transactions;
    BehaviorPattern {
        rapid_transactions: has_rapid_burst(transactions),
        suspicious_gas_usage: has_gas_price_outlier(transactions),
        unusual_amounts: has_value_outlier(transactions),
    }
}

/// Expects transactions ordered oldest first.
fn has_rapid_burst(transactions: &[ObservedTransaction]) -> bool {
    let mut start = 0;
    for end in 0..transactions.len() {
        while (transactions[end].timestamp - transactions[start].timestamp).num_seconds()
            >= RAPID_WINDOW_SECS
        {
            start += 1;
        }
        if end - start + 1 > RAPID_TRANSACTION_THRESHOLD {
            return true;
        }
    }
    false
}

fn has_gas_price_outlier(transactions: &[ObservedTransaction]) -> bool {
    let prices: Vec<u128> = transactions.iter().map(|tx| tx.gas_price_wei).collect();
    exceeds_median_multiple(prices, GAS_PRICE_MULTIPLIER)
}

fn has_value_outlier(transactions: &[ObservedTransaction]) -> bool {
    // Reverted transfers moved nothing; zero-value calls say nothing about transfer sizes
    let values: Vec<u128> = transactions
        .iter()
        .filter(|tx| !tx.is_error)
        .map(|tx| tx.value_wei)
        .filter(|value| *value > 0)
        .collect();
    exceeds_median_multiple(values, UNUSUAL_VALUE_MULTIPLIER)
}

fn exceeds_median_multiple(mut samples: Vec<u128>, multiple: u128) -> bool {
    if samples.len() < MIN_BASELINE_SAMPLES {
        return false;
    }
    samples.sort_unstable();
    let median = samples[samples.len() / 2];
    if median == 0 {
        return false;
    }
    let limit = median.saturating_mul(multiple);
    samples.last().is_some_and(|max| *max > limit)
}
