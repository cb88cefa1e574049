//! Portfolio & Risk Management (Layer 3)
//!
//! Turns raw signals into sized, approved or rejected records.

mod config;
mod risk;

pub use config::{load_config, save_config, RiskConfig};
pub use risk::{RiskManager, POSITION_SIZE_PER_STRENGTH, RISK_SCORE_DIVISOR};
