//! Error types for the risk engine.

use thiserror::Error;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("External service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    /// A collaborator failed while analyzing a wallet. Nothing is cached.
    #[error("Failed to analyze wallet {address}: {source}")]
    AnalysisFailed {
        address: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Wrap a collaborator failure for the given address.
    #[must_use]
    pub fn analysis_failed(address: impl Into<String>, source: AppError) -> Self {
        Self::AnalysisFailed {
            address: address.into(),
            source: Box::new(source),
        }
    }
}

/// Input validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors raised by the on-chain and AML collaborators
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExternalServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
