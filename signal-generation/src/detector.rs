//! Directional signal detection

use common::{Observation, PipelineError, Signal, SignalType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Price-change thresholds, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Moves strictly above this are BUY
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: f64,
    /// Moves strictly below this are SELL
    #[serde(default = "default_sell_threshold")]
    pub sell_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            buy_threshold: default_buy_threshold(),
            sell_threshold: default_sell_threshold(),
        }
    }
}

fn default_buy_threshold() -> f64 {
    0.015
}

fn default_sell_threshold() -> f64 {
    -0.015
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.buy_threshold.is_finite() || !self.sell_threshold.is_finite() {
            return Err(PipelineError::config("detector thresholds must be finite"));
        }
        if self.buy_threshold <= self.sell_threshold {
            return Err(PipelineError::config(format!(
                "buy_threshold ({}) must be greater than sell_threshold ({})",
                self.buy_threshold, self.sell_threshold
            )));
        }
        Ok(())
    }
}

/// Classifies observations into BUY / SELL / HOLD
#[derive(Debug, Clone)]
pub struct SignalDetector {
    config: DetectorConfig,
}

impl SignalDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn classify(&self, change_percent: f64) -> SignalType {
        if change_percent > self.config.buy_threshold {
            SignalType::Buy
        } else if change_percent < self.config.sell_threshold {
            SignalType::Sell
        } else {
            SignalType::Hold
        }
    }

    /// Strength is the raw `change_percent`, sign included.
    pub fn detect(&self, observation: &Observation) -> Signal {
        Signal {
            observation: observation.clone(),
            signal_type: self.classify(observation.change_percent),
            signal_strength: observation.change_percent,
        }
    }

    pub fn detect_batch(&self, observations: &[Observation]) -> Vec<Signal> {
        let signals: Vec<Signal> = observations.iter().map(|o| self.detect(o)).collect();
        debug!(
            buy = signals.iter().filter(|s| s.signal_type == SignalType::Buy).count(),
            sell = signals.iter().filter(|s| s.signal_type == SignalType::Sell).count(),
            total = signals.len(),
            "Detected signals"
        );
        signals
    }
}
