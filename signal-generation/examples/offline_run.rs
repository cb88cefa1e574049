// Example: one pipeline run over fixed quotes
// Shows every stage without network access or API keys

use async_trait::async_trait;
use common::{Observation, PipelineError};
use data_ingestion::MarketDataSource;
use monitoring::{render_report, TracingReportSink};
use signal_generation::{FinancialPipeline, PipelineSettings};
use std::sync::Arc;

struct FixedQuotes(Vec<Observation>);

#[async_trait]
impl MarketDataSource for FixedQuotes {
    async fn fetch_latest(&self, symbol: &str) -> Result<Observation, PipelineError> {
        self.0
            .iter()
            .find(|q| q.symbol == symbol)
            .cloned()
            .ok_or_else(|| PipelineError::unavailable(symbol, "no fixed quote"))
    }
}

fn quote(symbol: &str, price: f64, volume: u64, change_percent: f64) -> Observation {
    Observation {
        symbol: symbol.to_string(),
        price,
        volume,
        timestamp: chrono::Utc::now().timestamp_millis(),
        change_percent,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::WARN).init();

    println!("=== Financial Pipeline - Offline Run ===\n");

    let source = Arc::new(FixedQuotes(vec![
        quote("AAPL", 150.0, 2_000_000, 2.0),
        quote("GOOGL", 140.2, 1_500_000, 1.2),
        quote("MSFT", 410.5, 3_000_000, 0.01),
        quote("TSLA", 250.0, 5_000_000, -3.0),
        quote("NVDA", 900.0, 40_000_000, 3.4),
    ]));

    let mut settings = PipelineSettings::default();
    settings.schedule.symbols = ["AAPL", "GOOGL", "MSFT", "TSLA", "NVDA", "AMZN"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let pipeline =
        FinancialPipeline::new(settings, source)?.add_sink(Box::new(TracingReportSink::new()));
    let report = pipeline.run_once().await?;

    for (title, table) in render_report(&report) {
        println!("{}\n{}\n", title, table);
    }

    println!(
        "AMZN has no quote and is skipped; TSLA is a SELL but is dropped by the risk filter."
    );
    println!(
        "{} observations -> {} signals -> {} retained -> {} alerts",
        report.observations.len(),
        report.signals.len(),
        report.risk_adjusted.len(),
        report.alerts.len()
    );

    Ok(())
}
