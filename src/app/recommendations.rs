//! Recommendation generation.
//!
//! Policy, in order:
//! 1. Auto-block: critical AML indicators short-circuit everything else.
//! 2. Exactly one score-tier verdict.
//! 3. AML due-diligence notes and non-critical indicator summary.
//! 4. Independent factor-specific nudges.

use crate::domain::{CRITICAL_INDICATOR_CODE, RiskFactors};

pub const AUTO_BLOCK_NOTICE: [&str; 3] = [
    "🚫 CRITICAL AML RISK - BLOCK IMMEDIATELY",
    "Wallet has interactions with sanctioned or high-risk entities.",
    "Compliance review required before any transaction.",
];

pub const TIER_BLOCK: &str = "🚫 BLOCK - Risk score is critical. Do not process payment.";
pub const TIER_REVIEW: &str = "⚠️ REVIEW REQUIRED - High risk detected. Manual review recommended.";
pub const TIER_REVIEW_FOLLOW_UP: &str =
    "Consider limiting transaction amount or requiring additional verification.";
pub const TIER_MONITOR: &str = "⚡ MONITOR - Medium risk. Allow transaction but monitor closely.";
pub const TIER_ALLOW: &str = "✅ ALLOW - Low risk. Safe to proceed with transaction.";

pub const AML_ENHANCED_DUE_DILIGENCE: &str =
    "High AML risk detected. Enhanced due diligence recommended.";
pub const AML_STANDARD_DUE_DILIGENCE: &str = "Moderate AML risk. Standard due diligence required.";

pub const NEW_WALLET: &str = "New wallet detected. Consider requiring additional verification.";
pub const LIMITED_HISTORY: &str = "Limited transaction history. Monitor for unusual behavior.";
pub const CONTRACT_ADDRESS: &str = "Smart contract address. Verify contract legitimacy.";
pub const RAPID_TRANSACTIONS: &str = "Rapid transaction pattern detected. Possible bot activity.";

/// Characters of an indicator's source shown in block notices
const SOURCE_EXCERPT_LEN: usize = 10;

/// Build the ordered recommendation list.
///
/// `auto_block` is the AML provider's verdict over the indicator list and is
/// only honored when the AML factor is present. Always returns at least one
/// line.
#[must_use]
pub fn generate_recommendations(score: u8, factors: &RiskFactors, auto_block: bool) -> Vec<String> {
    let mut recommendations = Vec::new();

    if let Some(aml) = &factors.aml_compliance
        && auto_block
    {
        recommendations.extend(AUTO_BLOCK_NOTICE.iter().map(|line| line.to_string()));
        recommendations.extend(
            aml.risk_indicators
                .iter()
                .filter(|indicator| indicator.code <= CRITICAL_INDICATOR_CODE)
                .map(|indicator| {
                    let excerpt: String =
                        indicator.source.chars().take(SOURCE_EXCERPT_LEN).collect();
                    format!("⚠️ {} detected (Source: {}...)", indicator.name, excerpt)
                }),
        );
        return recommendations;
    }

    match score {
        80..=u8::MAX => recommendations.push(TIER_BLOCK.to_string()),
        60..=79 => {
            recommendations.push(TIER_REVIEW.to_string());
            recommendations.push(TIER_REVIEW_FOLLOW_UP.to_string());
        }
        30..=59 => recommendations.push(TIER_MONITOR.to_string()),
        _ => recommendations.push(TIER_ALLOW.to_string()),
    }

    if let Some(aml) = &factors.aml_compliance {
        if aml.provider_score >= 6.0 {
            recommendations.push(AML_ENHANCED_DUE_DILIGENCE.to_string());
        } else if aml.provider_score >= 4.0 {
            recommendations.push(AML_STANDARD_DUE_DILIGENCE.to_string());
        }

        let non_critical: Vec<&str> = aml
            .risk_indicators
            .iter()
            .filter(|indicator| indicator.code > CRITICAL_INDICATOR_CODE)
            .map(|indicator| indicator.name.as_str())
            .collect();
        if !non_critical.is_empty() {
            recommendations.push(format!("AML indicators: {}", non_critical.join(", ")));
        }
    }

    if factors.wallet_age.age_in_days < 7 {
        recommendations.push(NEW_WALLET.to_string());
    }
    if factors.transaction_history.total_transactions < 5 {
        recommendations.push(LIMITED_HISTORY.to_string());
    }
    if factors.address_reputation.is_contract {
        recommendations.push(CONTRACT_ADDRESS.to_string());
    }
    if factors.behavior_patterns.rapid_transactions {
        recommendations.push(RAPID_TRANSACTIONS.to_string());
    }

    recommendations
}
