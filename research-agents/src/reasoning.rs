//! Free-text commentary for approved signals
//!
//! The reasoning step runs after the core pipeline has produced its outputs.
//! Failures here degrade to a placeholder and never invalidate those outputs.

use async_trait::async_trait;
use common::{Commentary, PipelineError, RiskAdjustedSignal};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Text used when no analysis could be produced for a record
pub const ANALYSIS_UNAVAILABLE: &str = "analysis unavailable";

const SYSTEM_PROMPT: &str = "You are a professional financial analyst. You are given a prompt \
and you need to reason about the prompt and provide a detailed analysis of the prompt.";

/// Settings for the chat-completions reasoning backend
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Commentary is skipped entirely when disabled or when no key is set
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on in-flight requests per run
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    4
}

/// Produces a free-text analysis of one approved record
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn explain(&self, record: &RiskAdjustedSignal) -> Result<String, PipelineError>;
}

/// Prompt sent for a single record
pub fn build_prompt(record: &RiskAdjustedSignal) -> String {
    format!(
        "Analyze this trading signal:\n\
         - Stock: {}\n\
         - Price: ${}\n\
         - Signal Strength: {}%\n\
         - Volume: {}\n\
         - Risk Score: {}\n\n\
         Provide a brief analysis and recommendation.",
        record.symbol(),
        record.price(),
        record.signal_strength(),
        record.volume(),
        record.risk_score,
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: String,
}

/// OpenAI-compatible chat-completions client (Groq by default)
pub struct ChatCompletionsEngine {
    config: ReasoningConfig,
    client: Client,
}

impl ChatCompletionsEngine {
    /// Fails when `config.api_key` is missing or empty.
    pub fn new(config: ReasoningConfig) -> anyhow::Result<Self> {
        if !has_key(&config) {
            anyhow::bail!("reasoning api_key is not set");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Build an engine only when commentary is enabled and a key is present.
    pub fn from_config(config: &ReasoningConfig) -> anyhow::Result<Option<Self>> {
        if config.enabled && has_key(config) {
            Ok(Some(Self::new(config.clone())?))
        } else {
            Ok(None)
        }
    }

    fn api_key(&self) -> &str {
        self.config.api_key.as_deref().unwrap_or_default()
    }
}

fn has_key(config: &ReasoningConfig) -> bool {
    config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

#[async_trait]
impl ReasoningEngine for ChatCompletionsEngine {
    async fn explain(&self, record: &RiskAdjustedSignal) -> Result<String, PipelineError> {
        let prompt = build_prompt(record);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(symbol = %record.symbol(), model = %self.config.model, "Requesting commentary");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key())
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::ReasoningUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| PipelineError::ReasoningUnavailable(e.to_string()))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ReasoningUnavailable(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| PipelineError::ReasoningUnavailable("empty completion".to_string()))
    }
}

/// Ask the engine about every approved record, keeping input order.
///
/// Records that are not approved are ignored. At most `max_concurrent`
/// requests are in flight. A failed call yields [`ANALYSIS_UNAVAILABLE`]
/// for that record only.
pub async fn commentate(
    engine: Arc<dyn ReasoningEngine>,
    records: &[RiskAdjustedSignal],
    max_concurrent: usize,
) -> Vec<Commentary> {
    let approved: Vec<RiskAdjustedSignal> =
        records.iter().filter(|r| r.approved).cloned().collect();
    if approved.is_empty() {
        return Vec::new();
    }

    // Limit concurrent requests
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = Vec::with_capacity(approved.len());

    for record in &approved {
        let semaphore = semaphore.clone();
        let engine = engine.clone();
        let record = record.clone();

        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await;
            engine.explain(&record).await
        }));
    }

    let results = join_all(tasks).await;

    let commentary: Vec<Commentary> = approved
        .into_iter()
        .zip(results)
        .map(|(record, result)| {
            let analysis = match result {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!(symbol = %record.symbol(), error = %e, "Commentary failed");
                    ANALYSIS_UNAVAILABLE.to_string()
                }
                Err(e) => {
                    warn!(symbol = %record.symbol(), error = %e, "Commentary task aborted");
                    ANALYSIS_UNAVAILABLE.to_string()
                }
            };
            Commentary {
                symbol: record.symbol().to_string(),
                analysis,
                original_signal: record,
            }
        })
        .collect();

    info!("Generated commentary for {} approved signals", commentary.len());
    commentary
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Observation, Signal, SignalType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn assert_send<T: Send>(_: T) {}

    struct EchoEngine;

    #[async_trait]
    impl ReasoningEngine for EchoEngine {
        async fn explain(&self, record: &RiskAdjustedSignal) -> Result<String, PipelineError> {
            if record.symbol() == "FAIL" {
                Err(PipelineError::ReasoningUnavailable("boom".to_string()))
            } else {
                Ok(format!("{} looks fine", record.symbol()))
            }
        }
    }

    fn record(symbol: &str, strength: f64, approved: bool) -> RiskAdjustedSignal {
        RiskAdjustedSignal {
            signal: Signal {
                observation: Observation {
                    symbol: symbol.to_string(),
                    price: 150.0,
                    volume: 2_000_000,
                    timestamp: 0,
                    change_percent: strength,
                },
                signal_type: SignalType::Buy,
                signal_strength: strength,
            },
            position_size: strength * 1000.0,
            risk_score: strength / 5.0,
            approved,
        }
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_prompt(&record("AAPL", 2.0, true));
        assert!(prompt.contains("- Stock: AAPL"));
        assert!(prompt.contains("- Price: $150"));
        assert!(prompt.contains("- Signal Strength: 2%"));
        assert!(prompt.contains("- Volume: 2000000"));
        assert!(prompt.contains("- Risk Score: 0.4"));
    }

    #[tokio::test]
    async fn test_only_approved_records_are_explained() {
        let records = vec![record("AAPL", 2.0, true), record("MSFT", 1.2, false)];
        let commentary = commentate(Arc::new(EchoEngine), &records, 2).await;

        assert_eq!(commentary.len(), 1);
        assert_eq!(commentary[0].symbol, "AAPL");
        assert_eq!(commentary[0].analysis, "AAPL looks fine");
        assert_eq!(commentary[0].original_signal, records[0]);
    }

    #[tokio::test]
    async fn test_failure_degrades_per_record() {
        let records = vec![
            record("FAIL", 2.0, true),
            record("TSLA", 3.0, true),
        ];
        let commentary = commentate(Arc::new(EchoEngine), &records, 1).await;

        assert_eq!(commentary.len(), 2);
        assert_eq!(commentary[0].analysis, ANALYSIS_UNAVAILABLE);
        assert_eq!(commentary[1].analysis, "TSLA looks fine");
    }

    #[test]
    fn test_engine_requires_key() {
        let config = ReasoningConfig::default();
        assert!(ChatCompletionsEngine::from_config(&config).unwrap().is_none());

        let config = ReasoningConfig {
            api_key: Some("k".to_string()),
            enabled: false,
            ..Default::default()
        };
        assert!(ChatCompletionsEngine::from_config(&config).unwrap().is_none());

        let config = ReasoningConfig {
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        assert!(ChatCompletionsEngine::from_config(&config).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_reasoning_unavailable() {
        let config = ReasoningConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let engine = ChatCompletionsEngine::new(ReasoningConfig {
            api_key: Some("test".to_string()),
            ..config
        })
        .unwrap();
        let err = engine.explain(&record("AAPL", 2.0, true)).await.unwrap_err();
        assert!(matches!(err, PipelineError::ReasoningUnavailable(_)));
    }

    /// Tracks how many explain calls overlap; later records finish first.
    struct SlowEngine {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ReasoningEngine for SlowEngine {
        async fn explain(&self, record: &RiskAdjustedSignal) -> Result<String, PipelineError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = (10.0 - record.signal_strength()) as u64 * 10;
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(record.symbol().to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded_and_order_kept() {
        let engine = Arc::new(SlowEngine {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let records = vec![
            record("A", 2.0, true),
            record("B", 4.0, true),
            record("C", 6.0, true),
            record("D", 8.0, true),
        ];

        let commentary = commentate(engine.clone(), &records, 2).await;

        let symbols: Vec<&str> = commentary.iter().map(|c| c.analysis.as_str()).collect();
        assert_eq!(symbols, vec!["A", "B", "C", "D"]);
        assert_eq!(engine.peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_commentate_future_is_send() {
        let records = vec![record("AAPL", 2.0, true)];
        assert_send(commentate(Arc::new(EchoEngine), &records, 2));
    }

    #[test]
    fn test_new_requires_key() {
        assert!(ChatCompletionsEngine::new(ReasoningConfig::default()).is_err());
        let blank = ReasoningConfig {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(ChatCompletionsEngine::from_config(&blank).unwrap().is_none());
    }
}
