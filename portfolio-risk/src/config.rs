//! Risk management configuration

use common::PipelineError;
use serde::{Deserialize, Serialize};

/// Sizing and approval settings for the risk stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum fraction of the portfolio allowed for a single position
    #[serde(default = "default_max_position_size")]
    pub max_position_size: f64,

    /// Maximum fraction of the portfolio at risk.
    /// Reserved for portfolio-level aggregation; filtering ignores it.
    #[serde(default = "default_max_portfolio_risk")]
    pub max_portfolio_risk: f64,

    /// Signals at or below this strength are dropped
    #[serde(default = "default_retention_threshold")]
    pub retention_threshold: f64,

    /// Retained signals above this strength are approved
    #[serde(default = "default_approval_threshold")]
    pub approval_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: default_max_position_size(),
            max_portfolio_risk: default_max_portfolio_risk(),
            retention_threshold: default_retention_threshold(),
            approval_threshold: default_approval_threshold(),
        }
    }
}

fn default_max_position_size() -> f64 {
    0.1
}

fn default_max_portfolio_risk() -> f64 {
    0.05
}

fn default_retention_threshold() -> f64 {
    1.0
}

fn default_approval_threshold() -> f64 {
    1.5
}

impl RiskConfig {
    /// Check the invariants the risk stage relies on.
    ///
    /// Approval must be strictly stricter than retention so that every
    /// approved record is also a retained one.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.retention_threshold.is_finite() || !self.approval_threshold.is_finite() {
            return Err(PipelineError::config("risk thresholds must be finite"));
        }
        if self.approval_threshold <= self.retention_threshold {
            return Err(PipelineError::config(format!(
                "approval_threshold ({}) must be greater than retention_threshold ({})",
                self.approval_threshold, self.retention_threshold
            )));
        }
        if !(self.max_position_size > 0.0 && self.max_position_size <= 1.0) {
            return Err(PipelineError::config(format!(
                "max_position_size must be in (0, 1], got {}",
                self.max_position_size
            )));
        }
        if !(0.0..=1.0).contains(&self.max_portfolio_risk) {
            return Err(PipelineError::config(format!(
                "max_portfolio_risk must be in [0, 1], got {}",
                self.max_portfolio_risk
            )));
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<RiskConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RiskConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to TOML file
pub fn save_config(config: &RiskConfig, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RiskConfig::default();
        assert_eq!(config.max_position_size, 0.1);
        assert_eq!(config.max_portfolio_risk, 0.05);
        assert_eq!(config.retention_threshold, 1.0);
        assert_eq!(config.approval_threshold, 1.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = RiskConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: RiskConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RiskConfig = toml::from_str("max_position_size = 0.2").unwrap();
        assert_eq!(config.max_position_size, 0.2);
        assert_eq!(config.approval_threshold, 1.5);
    }

    #[test]
    fn test_approval_must_exceed_retention() {
        let config = RiskConfig {
            approval_threshold: 1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_position_size_bounds() {
        let config = RiskConfig {
            max_position_size: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RiskConfig {
            max_portfolio_risk: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
