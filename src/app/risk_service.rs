//! Wallet risk analysis service.
//!
//! Combines on-chain behavior with the AML provider's verdict:
//! 1. Check the analysis cache (fast path)
//! 2. Fetch the on-chain observation and AML result concurrently (slow path)
//! 3. Score, aggregate and generate recommendations
//! 4. Cache and return the analysis
//!
//! A failure in either collaborator aborts the whole analysis; partial
//! results are never cached or returned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument};

use super::aggregator::{AmlAssessment, FactorInputs, aggregate, calculate_risk_factors};
use super::cache::{
    CacheSweeper, Clock, DEFAULT_CACHE_TTL, DEFAULT_SWEEP_INTERVAL, RiskCache, SystemClock,
};
use super::recommendations::generate_recommendations;
use crate::domain::{
    AmlProvider, AppError, ExternalServiceError, OnChainDataSource, RiskAnalysis, ValidationError,
};

/// Default per-fetch deadline for collaborator calls
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Chain the AML provider is queried for by default (Base Sepolia)
pub const DEFAULT_AML_CHAIN_ID: u64 = 84532;

/// Configuration for the risk engine
#[derive(Debug, Clone)]
pub struct RiskEngineConfig {
    /// How long a completed analysis is served from cache
    pub cache_ttl: Duration,
    /// How often expired cache entries are evicted
    pub sweep_interval: Duration,
    /// Deadline applied to each collaborator call
    pub fetch_timeout: Duration,
    /// Chain identifier passed to the AML provider
    pub aml_chain_id: u64,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            aml_chain_id: DEFAULT_AML_CHAIN_ID,
        }
    }
}

impl RiskEngineConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        use std::env;

        let secs = |name: &str| env::var(name).ok().and_then(|v| v.parse::<u64>().ok());
        let defaults = Self::default();

        Self {
            cache_ttl: secs("RISK_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            sweep_interval: secs("RISK_CACHE_SWEEP_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            fetch_timeout: secs("RISK_FETCH_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            aml_chain_id: secs("AML_CHAIN_ID").unwrap_or(defaults.aml_chain_id),
        }
    }
}

/// Service that produces explainable wallet risk analyses.
pub struct RiskService {
    onchain: Arc<dyn OnChainDataSource>,
    aml_provider: Arc<dyn AmlProvider>,
    cache: Arc<RiskCache>,
    config: RiskEngineConfig,
}

impl RiskService {
    /// Create a new RiskService backed by the system clock.
    ///
    /// # Arguments
    /// * `onchain` - Source of wallet transactions, balance and contract code
    /// * `aml_provider` - AML compliance provider
    /// * `config` - Cache and timeout settings
    pub fn new(
        onchain: Arc<dyn OnChainDataSource>,
        aml_provider: Arc<dyn AmlProvider>,
        config: RiskEngineConfig,
    ) -> Self {
        Self::with_clock(onchain, aml_provider, config, Arc::new(SystemClock))
    }

    /// Create a new RiskService with an injected clock.
    pub fn with_clock(
        onchain: Arc<dyn OnChainDataSource>,
        aml_provider: Arc<dyn AmlProvider>,
        config: RiskEngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(RiskCache::new(config.cache_ttl, clock));
        Self {
            onchain,
            aml_provider,
            cache,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RiskEngineConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<RiskCache> {
        &self.cache
    }

    /// Start the periodic cache sweep. Must be called within a Tokio runtime.
    #[must_use]
    pub fn start_cache_sweeper(&self) -> CacheSweeper {
        CacheSweeper::spawn(&self.cache, self.config.sweep_interval)
    }

    /// Evict expired cache entries now, independent of the sweeper.
    pub fn sweep_expired_cache(&self) {
        self.cache.sweep_expired();
    }

    /// Analyze a wallet address.
    ///
    /// Addresses are case-folded. A fresh cached analysis is returned without
    /// contacting either collaborator.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn analyze_wallet(&self, address: &str) -> Result<RiskAnalysis, AppError> {
        let normalized = address.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ValidationError::MissingField("address".to_string()).into());
        }

        if let Some(cached) = self.cache.get(&normalized) {
            debug!(address = %normalized, "Returning cached risk analysis");
            return Ok(cached);
        }

        debug!(address = %normalized, "Cache miss, calling collaborators");

        match self.compute_analysis(&normalized).await {
            Ok(analysis) => {
                self.cache
                    .put_until(&normalized, analysis.clone(), analysis.cache_expiry);
                info!(
                    address = %normalized,
                    risk_score = analysis.risk_score,
                    risk_level = %analysis.risk_level,
                    "Wallet analysis complete"
                );
                Ok(analysis)
            }
            Err(e) => {
                error!(address = %normalized, error = %e, "Wallet analysis failed");
                Err(AppError::analysis_failed(normalized, e))
            }
        }
    }

    async fn compute_analysis(&self, address: &str) -> Result<RiskAnalysis, AppError> {
        let (observation, aml_result) = tokio::try_join!(
            self.with_deadline("on-chain observation", self.onchain.fetch_observation(address)),
            self.with_deadline(
                "AML lookup",
                self.aml_provider
                    .fetch_aml_result(address, self.config.aml_chain_id),
            ),
        )?;

        let is_contract = self
            .with_deadline("contract detection", self.onchain.is_contract(address))
            .await?;
        let patterns = self.onchain.detect_patterns(&observation);

        if aml_result.is_none() {
            debug!(address = %address, "No AML data available, scoring without AML factor");
        }

        let aml_description = aml_result
            .as_ref()
            .map(|aml| self.aml_provider.describe_aml(aml.score, &aml.indicators));
        let auto_block = aml_result
            .as_ref()
            .is_some_and(|aml| self.aml_provider.should_auto_block(&aml.indicators));

        let computed_at = self.cache.now();
        let factors = calculate_risk_factors(FactorInputs {
            observation: &observation,
            is_contract,
            patterns: &patterns,
            aml: aml_result
                .as_ref()
                .zip(aml_description.as_deref())
                .map(|(result, description)| AmlAssessment {
                    result,
                    description,
                }),
            now: computed_at,
        });

        let (risk_score, risk_level) = aggregate(&factors);
        let recommendations = generate_recommendations(risk_score, &factors, auto_block);

        Ok(RiskAnalysis {
            wallet_address: address.to_string(),
            risk_score,
            risk_level,
            factors,
            recommendations,
            timestamp: computed_at,
            cache_expiry: self.cache.expiry_from(computed_at),
        })
    }

    async fn with_deadline<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        tokio::time::timeout(self.config.fetch_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(ExternalServiceError::Timeout(format!(
                    "{} exceeded {:?}",
                    operation, self.config.fetch_timeout
                ))
                .into())
            })
    }
}
