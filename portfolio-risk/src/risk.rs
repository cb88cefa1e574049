//! Retention filter, position sizing and approval

use crate::config::RiskConfig;
use common::{PipelineError, RiskAdjustedSignal, Signal};
use tracing::debug;

/// Position size per unit of signal strength used by the filtering path
pub const POSITION_SIZE_PER_STRENGTH: f64 = 1000.0;

/// Strength at which the risk score reaches 1.0
pub const RISK_SCORE_DIVISOR: f64 = 5.0;

/// Applies the retention filter and sizing rules to batches of signals
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    /// Create a risk manager with the default configuration
    pub fn new() -> Self {
        Self {
            config: RiskConfig::default(),
        }
    }

    /// Create a risk manager with a custom, validated configuration
    pub fn with_config(config: RiskConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Drop weak signals and size the rest.
    ///
    /// Strength is compared without taking its absolute value, so strong
    /// SELL signals (negative strength) never pass retention.
    pub fn apply_risk(&self, signals: &[Signal]) -> Vec<RiskAdjustedSignal> {
        let adjusted: Vec<RiskAdjustedSignal> = signals
            .iter()
            .filter(|s| s.signal_strength > self.config.retention_threshold)
            .map(|s| self.size(s))
            .collect();

        debug!(
            retained = adjusted.len(),
            dropped = signals.len() - adjusted.len(),
            approved = adjusted.iter().filter(|r| r.approved).count(),
            "Applied risk filters"
        );

        adjusted
    }

    fn size(&self, signal: &Signal) -> RiskAdjustedSignal {
        let strength = signal.signal_strength;
        RiskAdjustedSignal {
            signal: signal.clone(),
            position_size: strength * POSITION_SIZE_PER_STRENGTH,
            risk_score: strength / RISK_SCORE_DIVISOR,
            approved: strength > self.config.approval_threshold,
        }
    }

    /// Portfolio-relative position value for a signal.
    ///
    /// Not used by [`RiskManager::apply_risk`], which sizes with the flat
    /// per-strength multiplier instead.
    pub fn calculate_position_size(&self, signal_strength: f64, portfolio_value: f64) -> f64 {
        let position_multiplier = (signal_strength / RISK_SCORE_DIVISOR).min(1.0);
        let max_position_value = portfolio_value * self.config.max_position_size;
        max_position_value * position_multiplier
    }
}

impl Default for RiskManager {
    fn default() -> Self {
        Self::new()
    }
}
