//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::app::aggregator::{FactorInputs, aggregate, calculate_risk_factors};
use crate::app::cache::Clock;
use crate::app::recommendations::generate_recommendations;
use crate::domain::{
    AmlProvider, AmlResult, AppError, BehaviorPattern, ExternalServiceError, OnChainDataSource,
    RiskAnalysis, RiskIndicator, WalletObservation,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
    pub delay: Option<Duration>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
            delay: None,
        }
    }

    async fn apply(&self) -> Result<(), AppError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            let msg = self
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AppError::ExternalService(ExternalServiceError::Network(msg)));
        }
        Ok(())
    }
}

/// Clock whose time only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock on-chain data source that counts its calls
pub struct MockOnChainDataSource {
    observation: WalletObservation,
    is_contract: bool,
    patterns: BehaviorPattern,
    config: MockConfig,
    observation_calls: AtomicUsize,
    contract_calls: AtomicUsize,
}

impl MockOnChainDataSource {
    #[must_use]
    pub fn new(observation: WalletObservation) -> Self {
        Self::with_config(observation, MockConfig::success())
    }

    #[must_use]
    pub fn with_config(observation: WalletObservation, config: MockConfig) -> Self {
        Self {
            observation,
            is_contract: false,
            patterns: BehaviorPattern::default(),
            config,
            observation_calls: AtomicUsize::new(0),
            contract_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(WalletObservation::empty(""), MockConfig::failure(message))
    }

    #[must_use]
    pub fn with_contract(mut self, is_contract: bool) -> Self {
        self.is_contract = is_contract;
        self
    }

    #[must_use]
    pub fn with_patterns(mut self, patterns: BehaviorPattern) -> Self {
        self.patterns = patterns;
        self
    }

    /// Delay every fetch, to simulate a hung explorer
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay = Some(delay);
        self
    }

    pub fn observation_calls(&self) -> usize {
        self.observation_calls.load(Ordering::SeqCst)
    }

    pub fn contract_calls(&self) -> usize {
        self.contract_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OnChainDataSource for MockOnChainDataSource {
    async fn fetch_observation(&self, address: &str) -> Result<WalletObservation, AppError> {
        self.observation_calls.fetch_add(1, Ordering::SeqCst);
        self.config.apply().await?;
        let mut observation = self.observation.clone();
        observation.address = address.to_string();
        Ok(observation)
    }

    async fn is_contract(&self, _address: &str) -> Result<bool, AppError> {
        self.contract_calls.fetch_add(1, Ordering::SeqCst);
        self.config.apply().await?;
        Ok(self.is_contract)
    }

    fn detect_patterns(&self, _observation: &WalletObservation) -> BehaviorPattern {
        self.patterns
    }
}

/// Mock AML provider that counts its calls
pub struct MockAmlProvider {
    result: Option<AmlResult>,
    auto_block: Option<bool>,
    config: MockConfig,
    calls: AtomicUsize,
    last_chain_id: AtomicU64,
}

impl MockAmlProvider {
    #[must_use]
    pub fn with_config(result: Option<AmlResult>, config: MockConfig) -> Self {
        Self {
            result,
            auto_block: None,
            config,
            calls: AtomicUsize::new(0),
            last_chain_id: AtomicU64::new(0),
        }
    }

    /// Provider that has no data for any address
    #[must_use]
    pub fn no_data() -> Self {
        Self::with_config(None, MockConfig::success())
    }

    #[must_use]
    pub fn with_result(result: AmlResult) -> Self {
        Self::with_config(Some(result), MockConfig::success())
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(None, MockConfig::failure(message))
    }

    /// Override the provider's auto-block verdict
    #[must_use]
    pub fn with_auto_block(mut self, auto_block: bool) -> Self {
        self.auto_block = Some(auto_block);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_chain_id(&self) -> Option<u64> {
        match self.last_chain_id.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }
}

#[async_trait]
impl AmlProvider for MockAmlProvider {
    async fn fetch_aml_result(
        &self,
        _address: &str,
        chain_id: u64,
    ) -> Result<Option<AmlResult>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_chain_id.store(chain_id, Ordering::SeqCst);
        self.config.apply().await?;
        Ok(self.result.clone())
    }

    fn should_auto_block(&self, indicators: &[RiskIndicator]) -> bool {
        self.auto_block
            .unwrap_or_else(|| indicators.iter().any(RiskIndicator::is_critical))
    }
}

/// A complete analysis of an empty wallet, for cache tests
#[must_use]
pub fn sample_analysis(address: &str) -> RiskAnalysis {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let observation = WalletObservation::empty(address);
    let patterns = BehaviorPattern::default();
    let factors = calculate_risk_factors(FactorInputs {
        observation: &observation,
        is_contract: false,
        patterns: &patterns,
        aml: None,
        now,
    });
    let (risk_score, risk_level) = aggregate(&factors);
    let recommendations = generate_recommendations(risk_score, &factors, false);

    RiskAnalysis {
        wallet_address: address.to_lowercase(),
        risk_score,
        risk_level,
        factors,
        recommendations,
        timestamp: now,
        cache_expiry: now + chrono::Duration::hours(24),
    }
}
