//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{AppError, ExternalServiceError, ValidationError};
pub use traits::{AmlProvider, OnChainDataSource};
pub use types::{
    AddressReputationFactor, AmlComplianceFactor, AmlResult, BehaviorPattern,
    BehaviorPatternsFactor, CRITICAL_INDICATOR_CODE, ObservedTransaction, RiskAnalysis,
    RiskFactors, RiskIndicator, RiskLevel, TransactionFrequency, TransactionHistoryFactor,
    WEI_PER_ETH, WalletAgeFactor, WalletObservation,
};
