// Signal Pipeline
// Orchestrates one batch from fetch to report, once or on a schedule

use chrono::Utc;
use common::{PipelineError, PipelineReport};
use data_ingestion::{fetch_batch, MarketDataSource};
use monitoring::{AlertGenerator, ReportSink};
use portfolio_risk::RiskManager;
use research_agents::{commentate, InsightAnnotator, ReasoningEngine};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{PipelineSettings, ScheduleConfig};
use crate::detector::SignalDetector;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Fetching,
    Detecting,
    RiskFiltering,
    Annotating,
    Alerting,
    Commentating,
    Reporting,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The signal-to-decision pipeline plus its I/O collaborators
pub struct FinancialPipeline {
    schedule: ScheduleConfig,
    reasoning_concurrency: usize,
    source: Arc<dyn MarketDataSource>,
    detector: SignalDetector,
    risk_manager: RiskManager,
    annotator: InsightAnnotator,
    alert_generator: AlertGenerator,
    reasoning: Option<Arc<dyn ReasoningEngine>>,
    sinks: Vec<Box<dyn ReportSink>>,
    stage: Arc<RwLock<PipelineStage>>,
}

impl FinancialPipeline {
    /// Validate settings and build the stages. Invalid settings are fatal.
    pub fn new(
        settings: PipelineSettings,
        source: Arc<dyn MarketDataSource>,
    ) -> Result<Self, PipelineError> {
        settings.validate()?;

        Ok(Self {
            detector: SignalDetector::new(settings.detector.clone())?,
            risk_manager: RiskManager::with_config(settings.risk.clone())?,
            annotator: InsightAnnotator::new(),
            alert_generator: AlertGenerator::new(),
            reasoning_concurrency: settings.reasoning.max_concurrent_requests,
            schedule: settings.schedule,
            source,
            reasoning: None,
            sinks: Vec::new(),
            stage: Arc::new(RwLock::new(PipelineStage::Idle)),
        })
    }

    /// Attach a reasoning engine for commentary on approved signals
    pub fn with_reasoning(mut self, engine: Arc<dyn ReasoningEngine>) -> Self {
        info!("Commentary enabled for approved signals");
        self.reasoning = Some(engine);
        self
    }

    /// Add a report sink
    pub fn add_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub async fn stage(&self) -> PipelineStage {
        *self.stage.read().await
    }

    async fn enter(&self, stage: PipelineStage) {
        debug!(stage = %stage, "Pipeline stage");
        *self.stage.write().await = stage;
    }

    /// Run one batch through every stage and publish the report.
    ///
    /// Commentary runs strictly after alerts are produced; its failures only
    /// degrade the commentary text. A sink failure fails the run but the
    /// report has already been built.
    pub async fn run_once(&self) -> anyhow::Result<PipelineReport> {
        let started_at = Utc::now();
        info!("{}", "=".repeat(50));
        info!("Financial AI Analysis - {}", started_at.format("%Y-%m-%d %H:%M:%S"));
        info!("{}", "=".repeat(50));

        let result = self.execute(started_at).await;
        self.enter(PipelineStage::Idle).await;
        result
    }

    async fn execute(&self, started_at: chrono::DateTime<Utc>) -> anyhow::Result<PipelineReport> {
        let mut report = PipelineReport::empty(started_at);

        self.enter(PipelineStage::Fetching).await;
        report.observations = fetch_batch(self.source.as_ref(), &self.schedule.symbols).await;
        if report.observations.is_empty() {
            warn!("No market data fetched; continuing with an empty batch");
        }

        self.enter(PipelineStage::Detecting).await;
        report.signals = self.detector.detect_batch(&report.observations);

        self.enter(PipelineStage::RiskFiltering).await;
        report.risk_adjusted = self.risk_manager.apply_risk(&report.signals);

        self.enter(PipelineStage::Annotating).await;
        report.insights = self.annotator.annotate_batch(&report.risk_adjusted);
        if self.schedule.report_portfolio {
            report.portfolio = self.annotator.summarize_portfolio(&report.insights);
        }

        self.enter(PipelineStage::Alerting).await;
        report.alerts = self.alert_generator.generate_alerts(&report.risk_adjusted);

        if let Some(engine) = &self.reasoning {
            if report.approved_count() > 0 {
                self.enter(PipelineStage::Commentating).await;
                report.commentary =
                    commentate(engine.clone(), &report.risk_adjusted, self.reasoning_concurrency)
                        .await;
            }
        }

        self.enter(PipelineStage::Reporting).await;
        self.publish(&report).await?;

        info!(
            run_id = %report.run_id,
            observations = report.observations.len(),
            signals = report.signals.len(),
            retained = report.risk_adjusted.len(),
            approved = report.approved_count(),
            alerts = report.alerts.len(),
            "Signal analysis completed successfully"
        );

        Ok(report)
    }

    async fn publish(&self, report: &PipelineReport) -> anyhow::Result<()> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.publish(report).await {
                error!(run_id = %report.run_id, "Report sink failed: {:#}", e);
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "{} report sink(s) failed: {}",
                failures.len(),
                failures.join("; ")
            ))
        }
    }

    /// Repeat [`run_once`](Self::run_once) until `shutdown` becomes `true`.
    ///
    /// The signal is only observed between runs. A failed run is logged and
    /// retried after [`ScheduleConfig::retry_cooldown`]. Returns the number
    /// of completed runs.
    pub async fn run_continuous(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!("Starting continuous monitoring of {:?}", self.schedule.symbols);
        info!("Update interval: {} seconds", self.schedule.interval_secs);

        let mut runs = 0u64;
        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.run_once().await {
                Ok(report) => {
                    debug!(run_id = %report.run_id, "Run finished");
                    self.schedule.interval()
                }
                Err(e) => {
                    let cooldown = self.schedule.retry_cooldown();
                    error!("Error: {:#}", e);
                    warn!("Retrying in {} seconds...", cooldown.as_secs());
                    cooldown
                }
            };
            runs += 1;

            info!("⏳ Waiting {} seconds for next update...", wait.as_secs());
            if wait_or_shutdown(wait, &mut shutdown).await {
                break;
            }
        }

        info!("🛑 Monitoring stopped after {} run(s)", runs);
        runs
    }
}

/// Sleep for `wait`, returning early with `true` if shutdown is requested.
async fn wait_or_shutdown(wait: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = Instant::now() + wait;
    let signalled = tokio::time::timeout_at(deadline, shutdown.wait_for(|stop| *stop))
        .await
        .map(|changed| changed.is_ok());

    match signalled {
        Ok(true) => true,
        // Sender gone: nobody can stop us, keep the schedule
        Ok(false) => {
            tokio::time::sleep_until(deadline).await;
            false
        }
        Err(_) => false,
    }
}
