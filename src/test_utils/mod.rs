//! Test doubles shared by unit and integration tests.

mod mocks;

pub use mocks::{
    ManualClock, MockAmlProvider, MockConfig, MockOnChainDataSource, sample_analysis,
};
