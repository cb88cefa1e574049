//! Shared record types and errors for the market signal pipeline.

pub mod error;
pub mod model;

pub use error::PipelineError;
pub use model::{
    Alert, Commentary, Insight, MarketSentiment, Observation, PipelineReport, PortfolioAllocation,
    PortfolioEntry, RiskAdjustedSignal, RiskAssessment, Signal, SignalType, TradingRecommendation,
};

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
