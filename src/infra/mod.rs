//! Infrastructure layer implementations.

pub mod aml;
pub mod onchain;

pub use aml::MetaSleuthProvider;
pub use onchain::BasescanClient;
