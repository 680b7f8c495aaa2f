//! On-chain data source implementations.

pub mod basescan;
pub mod patterns;

pub use basescan::{BasescanClient, DEFAULT_BASESCAN_API_URL};
pub use patterns::detect_patterns;
