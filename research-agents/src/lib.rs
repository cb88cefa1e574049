//! Research Agents - Layer 1
//!
//! Interprets risk-adjusted signals:
//! - Declarative threshold bands for descriptive labels
//! - Insight annotation and the portfolio allocation view
//! - Free-text commentary from a hosted language model

pub mod bands;
pub mod insight;
pub mod reasoning;

// Re-export commonly used types
pub use bands::{Band, BandTable};
pub use insight::{confidence_score, InsightAnnotator};
pub use reasoning::{
    build_prompt, commentate, ChatCompletionsEngine, ReasoningConfig, ReasoningEngine,
    ANALYSIS_UNAVAILABLE,
};
