//! Wallet risk scoring engine.
//!
//! Combines on-chain behavioral signals with an AML provider's verdict into a
//! deterministic, explainable [`domain::RiskAnalysis`].

pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
