//! Application layer containing the scoring engine and its cache.

pub mod aggregator;
pub mod cache;
pub mod recommendations;
pub mod risk_service;
pub mod scoring;

pub use cache::{CacheSweeper, Clock, RiskCache, SystemClock};
pub use risk_service::{RiskEngineConfig, RiskService};
