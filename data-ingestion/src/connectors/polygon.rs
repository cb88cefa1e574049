use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::source::MarketDataSource;
use common::{Observation, PipelineError};

/// Connection settings for the Polygon.io REST API
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Supplied by the caller; never read from the environment here
    #[serde(default)]
    pub api_key: String,
    /// Per-request timeout. A timeout counts as a per-symbol failure.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for MarketDataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketDataConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_base_url() -> String {
    "https://api.polygon.io".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Previous-day aggregate response
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Vec<AggregateBar>,
}

#[derive(Debug, Deserialize)]
struct AggregateBar {
    /// Close
    c: f64,
    /// Open
    o: f64,
    /// Volume; Polygon encodes it as a float
    v: f64,
    /// Bar start, epoch milliseconds
    t: i64,
}

/// Polygon.io "previous close" connector
pub struct PolygonConnector {
    config: MarketDataConfig,
    client: Client,
}

impl PolygonConnector {
    pub fn new(config: MarketDataConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn aggregate_url(&self, symbol: &str) -> String {
        format!(
            "{}/v2/aggs/ticker/{}/prev",
            self.config.base_url.trim_end_matches('/'),
            symbol
        )
    }
}

#[async_trait]
impl MarketDataSource for PolygonConnector {
    async fn fetch_latest(&self, symbol: &str) -> Result<Observation, PipelineError> {
        let url = self.aggregate_url(symbol);
        debug!(symbol = %symbol, url = %url, "Requesting previous-day aggregate");

        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::unavailable(symbol, "request timed out")
                } else {
                    PipelineError::unavailable(symbol, e.to_string())
                }
            })?;

        let http_status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::unavailable(symbol, e.to_string()))?;

        if !http_status.is_success() {
            let detail = serde_json::from_str::<AggregateResponse>(&body)
                .ok()
                .and_then(|r| r.message.or(r.error))
                .unwrap_or_else(|| body.clone());
            return Err(PipelineError::unavailable(
                symbol,
                format!("Polygon API error {}: {}", http_status, detail),
            ));
        }

        parse_previous_close(symbol, &body)
    }
}

/// Turn a previous-close payload into an observation.
///
/// `change_percent` is the close-over-open move of the bar, in percent.
pub fn parse_previous_close(symbol: &str, body: &str) -> Result<Observation, PipelineError> {
    let response: AggregateResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::malformed(symbol, format!("invalid JSON: {}", e)))?;

    if let Some(status) = response.status.as_deref() {
        if status != "OK" {
            let detail = response
                .message
                .or(response.error)
                .unwrap_or_else(|| status.to_string());
            return Err(PipelineError::unavailable(
                symbol,
                format!("API error: {}", detail),
            ));
        }
    }

    let bar = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::unavailable(symbol, "no stock data found"))?;

    if bar.o.is_nan() || bar.o <= 0.0 {
        return Err(PipelineError::malformed(
            symbol,
            format!("open price must be positive, got {}", bar.o),
        ));
    }
    if !bar.v.is_finite() || bar.v < 0.0 {
        return Err(PipelineError::malformed(
            symbol,
            format!("volume must be non-negative, got {}", bar.v),
        ));
    }

    let change_percent = (bar.c - bar.o) / bar.o * 100.0;

    let observation = Observation {
        symbol: symbol.to_string(),
        price: bar.c,
        volume: bar.v as u64,
        timestamp: bar.t,
        change_percent,
    };
    observation.validate()?;

    Ok(observation)
}
