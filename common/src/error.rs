//! Error taxonomy shared by the pipeline crates

use thiserror::Error;

/// Failures at the pipeline's I/O boundary and at construction.
///
/// The stage transforms themselves never fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Per-symbol fetch failure. The symbol is skipped for this run.
    #[error("market data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Observation failed validation. The record is dropped.
    #[error("malformed observation for {symbol}: {reason}")]
    MalformedObservation { symbol: String, reason: String },

    /// Commentary could not be produced for a record.
    #[error("reasoning unavailable: {0}")]
    ReasoningUnavailable(String),

    /// Invalid settings. Fatal before the pipeline starts.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        PipelineError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(symbol: &str, reason: impl Into<String>) -> Self {
        PipelineError::MalformedObservation {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        PipelineError::Configuration(reason.into())
    }
}
