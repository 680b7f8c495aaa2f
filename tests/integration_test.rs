//! Integration tests for the risk engine.

use std::sync::Arc;

use chrono::{Duration, Utc};

use wallet_risk_engine::app::recommendations::{
    AUTO_BLOCK_NOTICE, CONTRACT_ADDRESS, LIMITED_HISTORY, NEW_WALLET, RAPID_TRANSACTIONS,
    TIER_ALLOW, TIER_BLOCK, TIER_MONITOR, TIER_REVIEW,
};
use wallet_risk_engine::app::{Clock, RiskEngineConfig, RiskService};
use wallet_risk_engine::domain::{
    AmlProvider, AmlResult, BehaviorPattern, ObservedTransaction, OnChainDataSource,
    RiskAnalysis, RiskIndicator, RiskLevel, WalletObservation,
};
use wallet_risk_engine::test_utils::{ManualClock, MockAmlProvider, MockOnChainDataSource};

fn create_service(
    onchain: MockOnChainDataSource,
    aml: MockAmlProvider,
) -> (RiskService, Arc<MockOnChainDataSource>, Arc<MockAmlProvider>, Arc<ManualClock>) {
    let onchain = Arc::new(onchain);
    let aml = Arc::new(aml);
    let clock = Arc::new(ManualClock::default());
    let service = RiskService::with_clock(
        onchain.clone() as Arc<dyn OnChainDataSource>,
        aml.clone() as Arc<dyn AmlProvider>,
        RiskEngineConfig::default(),
        clock.clone() as Arc<dyn Clock>,
    );
    (service, onchain, aml, clock)
}

/// Wallet with `count` daily transactions ending one day before `now`
fn history(now: chrono::DateTime<Utc>, count: i64, balance_wei: u128) -> WalletObservation {
    let transactions = (0..count)
        .map(|i| ObservedTransaction {
            hash: format!("0x{:064x}", i),
            timestamp: now - Duration::days(count - i),
            value_wei: 10_000_000_000_000_000,
            gas_price_wei: 1_000_000_000,
            gas_used: 21_000,
            is_error: false,
        })
        .collect();
    WalletObservation::from_transactions("0xwallet", balance_wei, transactions)
}

fn assert_score_invariants(analysis: &RiskAnalysis) {
    assert!(analysis.risk_score <= 100);
    assert_eq!(analysis.risk_level, RiskLevel::from_score(analysis.risk_score));
    assert!(!analysis.recommendations.is_empty());
}

#[tokio::test]
async fn test_empty_wallet_without_aml() {
    let (service, _, _, _) = create_service(
        MockOnChainDataSource::new(WalletObservation::empty("0xwallet")),
        MockAmlProvider::no_data(),
    );

    let analysis = service.analyze_wallet("0xWALLET").await.unwrap();

    assert_score_invariants(&analysis);
    assert_eq!(analysis.factors.wallet_age.score, 100);
    assert_eq!(analysis.factors.transaction_history.score, 100);
    assert_eq!(analysis.factors.address_reputation.score, 0);
    assert_eq!(analysis.factors.behavior_patterns.score, 0);
    assert!(analysis.factors.aml_compliance.is_none());
    assert_eq!(analysis.risk_score, 45);
    assert_eq!(analysis.risk_level, RiskLevel::Medium);
    assert_eq!(
        analysis.recommendations,
        vec![TIER_MONITOR, NEW_WALLET, LIMITED_HISTORY]
    );
}

#[tokio::test]
async fn test_sanctioned_wallet_is_auto_blocked() {
    let aml = AmlResult {
        score: 9.0,
        indicators: vec![
            RiskIndicator::new(5001, "Sanctioned Entity", "0x8589427373d6d84e98730d7795d8f6f8731fda16"),
            RiskIndicator::new(5300, "Gambling", "0x1111111111111111111111111111111111111111"),
        ],
    };
    let (service, _, _, clock) = create_service(
        MockOnChainDataSource::new(history(ManualClock::default().now(), 60, 1)),
        MockAmlProvider::with_result(aml),
    );

    let analysis = service.analyze_wallet("0xwallet").await.unwrap();

    assert_score_invariants(&analysis);
    assert_eq!(analysis.timestamp, clock.now());
    assert_eq!(analysis.factors.aml_compliance.as_ref().unwrap().score, 100);
    assert_eq!(
        analysis.recommendations,
        vec![
            AUTO_BLOCK_NOTICE[0].to_string(),
            AUTO_BLOCK_NOTICE[1].to_string(),
            AUTO_BLOCK_NOTICE[2].to_string(),
            "⚠️ Sanctioned Entity detected (Source: 0x85894273...)".to_string(),
        ]
    );
    for tier in [TIER_BLOCK, TIER_REVIEW, TIER_MONITOR, TIER_ALLOW] {
        assert!(!analysis.recommendations.iter().any(|r| r == tier));
    }
}

#[tokio::test]
async fn test_established_wallet_with_clean_aml_is_allowed() {
    let aml = AmlResult {
        score: 1.0,
        indicators: vec![],
    };
    let now = ManualClock::default().now();
    let (service, _, _, _) = create_service(
        MockOnChainDataSource::new(history(now, 200, 1)),
        MockAmlProvider::with_result(aml),
    );

    let analysis = service.analyze_wallet("0xwallet").await.unwrap();

    // 10*0.20 + 15*0.25 + 0 + 0 + 10*0.30 = 8.75
    assert_eq!(analysis.risk_score, 9);
    assert_eq!(analysis.risk_level, RiskLevel::Low);
    assert_eq!(analysis.recommendations, vec![TIER_ALLOW]);
    assert_eq!(
        analysis.factors.aml_compliance.as_ref().unwrap().description,
        "AML risk score 1/10 (Minimal risk)"
    );
}

#[tokio::test]
async fn test_risky_new_contract_with_bot_activity() {
    let aml = AmlResult {
        score: 6.5,
        indicators: vec![RiskIndicator::new(5100, "Mixer", "0xmixer")],
    };
    let now = ManualClock::default().now();
    let (service, _, _, _) = create_service(
        MockOnChainDataSource::new(history(now, 3, 0))
            .with_contract(true)
            .with_patterns(BehaviorPattern {
                rapid_transactions: true,
                suspicious_gas_usage: true,
                unusual_amounts: false,
            }),
        MockAmlProvider::with_result(aml),
    );

    let analysis = service.analyze_wallet("0xwallet").await.unwrap();

    // age 3d: 80*0.20=16, 3 tx: 70*0.25=17.5, contract+drained: 50*0.15=7.5,
    // behavior 70*0.10=7, aml 85*0.30=25.5 => 73.5
    assert_eq!(analysis.risk_score, 74);
    assert_eq!(analysis.risk_level, RiskLevel::High);
    assert_eq!(
        analysis.recommendations,
        vec![
            TIER_REVIEW.to_string(),
            "Consider limiting transaction amount or requiring additional verification."
                .to_string(),
            "High AML risk detected. Enhanced due diligence recommended.".to_string(),
            "AML indicators: Mixer".to_string(),
            NEW_WALLET.to_string(),
            LIMITED_HISTORY.to_string(),
            CONTRACT_ADDRESS.to_string(),
            RAPID_TRANSACTIONS.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_score_without_aml_never_exceeds_seventy() {
    let (service, _, _, _) = create_service(
        MockOnChainDataSource::new(WalletObservation::empty("0xwallet"))
            .with_contract(true)
            .with_patterns(BehaviorPattern {
                rapid_transactions: true,
                suspicious_gas_usage: true,
                unusual_amounts: true,
            }),
        MockAmlProvider::no_data(),
    );

    let analysis = service.analyze_wallet("0xwallet").await.unwrap();

    // 20 + 25 + 4.5 + 10; reputation stays at 30 for a contract with no history
    assert_eq!(analysis.risk_score, 60);
    assert!(analysis.risk_score <= 70);
    assert_eq!(analysis.risk_level, RiskLevel::High);
}

#[tokio::test]
async fn test_cache_idempotence_and_expiry() {
    let (service, onchain, aml, clock) = create_service(
        MockOnChainDataSource::new(WalletObservation::empty("0xwallet")),
        MockAmlProvider::no_data(),
    );

    let first = service.analyze_wallet("0xwallet").await.unwrap();
    clock.advance(Duration::hours(23));
    let second = service.analyze_wallet("0xWallet").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(onchain.observation_calls(), 1);
    assert_eq!(onchain.contract_calls(), 1);
    assert_eq!(aml.calls(), 1);

    clock.advance(Duration::hours(1));
    let third = service.analyze_wallet("0xwallet").await.unwrap();

    assert_eq!(onchain.observation_calls(), 2);
    assert_eq!(aml.calls(), 2);
    assert_eq!(third.timestamp, clock.now());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_for_same_address() {
    let (service, onchain, aml, _) = create_service(
        MockOnChainDataSource::new(WalletObservation::empty("0xwallet"))
            .with_delay(std::time::Duration::from_secs(1)),
        MockAmlProvider::no_data(),
    );
    let service = Arc::new(service);

    // Every task reaches the slow fetch before any of them can populate the cache
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.analyze_wallet("0xwallet").await })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    // No request coalescing: each miss fetches, the last write wins
    assert_eq!(onchain.observation_calls(), 8);
    assert_eq!(aml.calls(), 8);
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(service.cache().len(), 1);

    let cached = service.analyze_wallet("0xwallet").await.unwrap();
    assert!(results.contains(&cached));
    assert_eq!(onchain.observation_calls(), 8);
}

#[tokio::test]
async fn test_failed_analysis_leaves_no_trace() {
    let (service, _, _, _) = create_service(
        MockOnChainDataSource::failing("rate limited"),
        MockAmlProvider::no_data(),
    );

    let err = service.analyze_wallet("0xwallet").await.unwrap_err();

    assert!(err.to_string().starts_with("Failed to analyze wallet 0xwallet"));
    assert!(err.to_string().contains("rate limited"));
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_analysis_serializes_to_json() {
    let (service, _, _, _) = create_service(
        MockOnChainDataSource::new(WalletObservation::empty("0xwallet")),
        MockAmlProvider::no_data(),
    );

    let analysis = service.analyze_wallet("0xwallet").await.unwrap();
    let json = serde_json::to_value(&analysis).unwrap();

    assert_eq!(json["wallet_address"], "0xwallet");
    assert_eq!(json["risk_score"], 45);
    assert_eq!(json["risk_level"], "medium");
    assert_eq!(json["factors"]["transaction_history"]["transaction_frequency"], "None");
    assert!(json["factors"].get("aml_compliance").is_none());

    let decoded: RiskAnalysis = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, analysis);
}
