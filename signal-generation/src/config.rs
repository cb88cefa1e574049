//! Pipeline settings
//!
//! Settings are layered: defaults, then an optional TOML file, then
//! `PIPELINE__SECTION__KEY` environment variables. API keys are injected by
//! the caller and are never read from the environment here.

use common::PipelineError;
use data_ingestion::MarketDataConfig;
use portfolio_risk::RiskConfig;
use research_agents::ReasoningConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::detector::DetectorConfig;

/// How the pipeline is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One fetch-analyse-report cycle
    #[default]
    Once,
    /// Repeat on a fixed interval until interrupted
    Continuous,
}

/// Polling and reporting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub mode: RunMode,

    /// Seconds between runs in continuous mode
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Lower bound on the wait after a failed run
    #[serde(default = "default_error_cooldown_secs")]
    pub error_cooldown_secs: u64,

    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Include the portfolio allocation view in each report
    #[serde(default = "default_report_portfolio")]
    pub report_portfolio: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            interval_secs: default_interval_secs(),
            error_cooldown_secs: default_error_cooldown_secs(),
            symbols: default_symbols(),
            report_portfolio: default_report_portfolio(),
        }
    }
}

fn default_interval_secs() -> u64 {
    300
}

fn default_error_cooldown_secs() -> u64 {
    60
}

fn default_symbols() -> Vec<String> {
    ["AAPL", "GOOGL", "MSFT", "TSLA"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_report_portfolio() -> bool {
    true
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Wait after a failed run: the cooldown floor or twice the interval,
    /// whichever is longer, so a retry always waits longer than a normal run.
    pub fn retry_cooldown(&self) -> Duration {
        let secs = self
            .error_cooldown_secs
            .max(self.interval_secs.saturating_mul(2));
        Duration::from_secs(secs)
    }
}

/// Everything needed to construct a pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl PipelineSettings {
    /// Load defaults, then `path` (or `./pipeline.toml` if present), then env.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, env_source())
    }

    /// Same as [`load`](Self::load) with an explicit environment layer.
    pub fn load_with_env(path: Option<&Path>, env: config::Environment) -> anyhow::Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("pipeline").required(false),
        };

        let settings: PipelineSettings = config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Inject provider credentials. `None` leaves the current value.
    pub fn with_api_keys(mut self, market_data: Option<String>, reasoning: Option<String>) -> Self {
        if let Some(key) = market_data {
            self.market_data.api_key = key;
        }
        if let Some(key) = reasoning {
            self.reasoning.api_key = Some(key);
        }
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.detector.validate()?;
        self.risk.validate()?;

        if self.schedule.interval_secs == 0 {
            return Err(PipelineError::config("schedule.interval_secs must be positive"));
        }
        if self.schedule.symbols.is_empty() {
            return Err(PipelineError::config("schedule.symbols must not be empty"));
        }
        if self.schedule.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(PipelineError::config("schedule.symbols contains a blank entry"));
        }
        if self.market_data.timeout_secs == 0 {
            return Err(PipelineError::config("market_data.timeout_secs must be positive"));
        }
        if self.reasoning.enabled {
            if self.reasoning.timeout_secs == 0 {
                return Err(PipelineError::config("reasoning.timeout_secs must be positive"));
            }
            if self.reasoning.max_concurrent_requests == 0 {
                return Err(PipelineError::config(
                    "reasoning.max_concurrent_requests must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// `PIPELINE__<SECTION>__<KEY>` overrides; `schedule.symbols` is comma separated
pub fn env_source() -> config::Environment {
    config::Environment::with_prefix("PIPELINE")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("schedule.symbols")
        .try_parsing(true)
}

/// Commented template matching the defaults
pub const CONFIG_TEMPLATE: &str = "# Market signal pipeline configuration
# Environment overrides use PIPELINE__<SECTION>__<KEY>, e.g.
#   PIPELINE__SCHEDULE__INTERVAL_SECS=60
#   PIPELINE__SCHEDULE__SYMBOLS=AAPL,MSFT
# API keys come from POLYGON_API_KEY and GROQ_API_KEY.

[detector]
# change_percent strictly above this is BUY
buy_threshold = 0.015
# change_percent strictly below this is SELL
sell_threshold = -0.015

[risk]
# Maximum fraction of the portfolio for one position
max_position_size = 0.1
# Reserved for portfolio-level aggregation
max_portfolio_risk = 0.05
# Signals at or below this strength are dropped
retention_threshold = 1.0
# Retained signals above this strength are approved
approval_threshold = 1.5

[market_data]
base_url = \"https://api.polygon.io\"
timeout_secs = 10

[reasoning]
enabled = true
base_url = \"https://api.groq.com/openai/v1\"
model = \"llama-3.1-8b-instant\"
max_tokens = 1000
temperature = 0.3
timeout_secs = 30
max_concurrent_requests = 4

[schedule]
# once | continuous
mode = \"once\"
interval_secs = 300
# Failed runs wait max(error_cooldown_secs, 2 * interval_secs)
error_cooldown_secs = 60
symbols = [\"AAPL\", \"GOOGL\", \"MSFT\", \"TSLA\"]
report_portfolio = true
";

/// Write the configuration template to `path`
pub fn create_config_template(path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, CONFIG_TEMPLATE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = PipelineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.schedule.symbols, vec!["AAPL", "GOOGL", "MSFT", "TSLA"]);
        assert_eq!(settings.schedule.mode, RunMode::Once);
    }

    #[test]
    fn test_template_matches_defaults() {
        let parsed: PipelineSettings = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(parsed, PipelineSettings::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: PipelineSettings = toml::from_str(
            "[schedule]\nmode = \"continuous\"\nsymbols = [\"NVDA\"]\n",
        )
        .unwrap();
        assert_eq!(parsed.schedule.mode, RunMode::Continuous);
        assert_eq!(parsed.schedule.symbols, vec!["NVDA"]);
        assert_eq!(parsed.schedule.interval_secs, 300);
        assert_eq!(parsed.risk, RiskConfig::default());
    }

    #[test]
    fn test_retry_cooldown_exceeds_interval() {
        let mut schedule = ScheduleConfig::default();
        assert_eq!(schedule.retry_cooldown(), Duration::from_secs(600));

        schedule.interval_secs = 10;
        assert_eq!(schedule.retry_cooldown(), Duration::from_secs(60));
        assert!(schedule.retry_cooldown() > schedule.interval());
    }

    #[test]
    fn test_inverted_detector_thresholds_rejected() {
        let mut settings = PipelineSettings::default();
        settings.detector.buy_threshold = -0.02;
        settings.detector.sell_threshold = 0.02;
        assert!(matches!(settings.validate(), Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_schedule_rules() {
        let mut settings = PipelineSettings::default();
        settings.schedule.interval_secs = 0;
        assert!(settings.validate().is_err());

        let mut settings = PipelineSettings::default();
        settings.schedule.symbols.clear();
        assert!(settings.validate().is_err());

        let mut settings = PipelineSettings::default();
        settings.schedule.symbols.push(" ".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_with_api_keys() {
        let settings = PipelineSettings::default()
            .with_api_keys(Some("poly".to_string()), None);
        assert_eq!(settings.market_data.api_key, "poly");
        assert_eq!(settings.reasoning.api_key, None);

        let settings = settings.with_api_keys(None, Some("groq".to_string()));
        assert_eq!(settings.market_data.api_key, "poly");
        assert_eq!(settings.reasoning.api_key.as_deref(), Some("groq"));
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_source().source(Some(map))
    }

    fn temp_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("pipeline-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_from_file() {
        let path = temp_config("[risk]\napproval_threshold = 2.0\n");

        // process environment is ignored
        let settings = PipelineSettings::load_with_env(Some(&path), env(&[])).unwrap();
        assert_eq!(settings.risk.approval_threshold, 2.0);
        assert_eq!(settings.detector, DetectorConfig::default());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_env_overrides_file() {
        let path = temp_config("[schedule]\ninterval_secs = 120\nsymbols = [\"AAPL\"]\n");

        let settings = PipelineSettings::load_with_env(
            Some(&path),
            env(&[
                ("PIPELINE__SCHEDULE__INTERVAL_SECS", "60"),
                ("PIPELINE__SCHEDULE__SYMBOLS", "NVDA,AMD"),
                ("OTHER__SCHEDULE__INTERVAL_SECS", "1"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.schedule.interval_secs, 60);
        assert_eq!(settings.schedule.symbols, vec!["NVDA", "AMD"]);

        let _ = std::fs::remove_file(&path);
    }
}
