//! Reporting sinks for pipeline runs
//!
//! Sinks are push-only: the pipeline hands each finished report to every
//! registered sink and does not wait for any acknowledgment beyond the call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use common::PipelineReport;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Consumer of finished pipeline reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, report: &PipelineReport) -> Result<()>;
}

/// Renders every table of a report through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingReportSink;

impl TracingReportSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportSink for TracingReportSink {
    async fn publish(&self, report: &PipelineReport) -> Result<()> {
        for (title, table) in render_report(report) {
            info!("{}\n{}", title, table);
        }
        Ok(())
    }
}

/// Appends each report as one JSON line to a file
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSink for JsonLinesSink {
    async fn publish(&self, report: &PipelineReport) -> Result<()> {
        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open report file {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Title and rendered text for each table of a report, in pipeline order
pub fn render_report(report: &PipelineReport) -> Vec<(String, String)> {
    let mut tables = Vec::new();

    tables.push((
        format!(
            "Financial AI Analysis - {} (run {})",
            report.started_at.format("%Y-%m-%d %H:%M:%S"),
            report.run_id
        ),
        render_table(
            &["symbol", "price", "volume", "timestamp", "change_percent"],
            report
                .observations
                .iter()
                .map(|o| {
                    vec![
                        o.symbol.clone(),
                        format!("{:.2}", o.price),
                        o.volume.to_string(),
                        o.timestamp.to_string(),
                        format!("{:.4}", o.change_percent),
                    ]
                })
                .collect(),
        ),
    ));

    tables.push((
        "Trading Signals:".to_string(),
        render_table(
            &["symbol", "price", "change_percent", "signal_type", "signal_strength"],
            report
                .signals
                .iter()
                .map(|s| {
                    vec![
                        s.symbol().to_string(),
                        format!("{:.2}", s.observation.price),
                        format!("{:.4}", s.observation.change_percent),
                        s.signal_type.to_string(),
                        format!("{:.4}", s.signal_strength),
                    ]
                })
                .collect(),
        ),
    ));

    tables.push((
        "Risk-Adjusted Signals:".to_string(),
        render_table(
            &["symbol", "signal_type", "signal_strength", "position_size", "risk_score", "approved"],
            report
                .risk_adjusted
                .iter()
                .map(|r| {
                    vec![
                        r.symbol().to_string(),
                        r.signal_type().to_string(),
                        format!("{:.4}", r.signal_strength()),
                        format!("{:.2}", r.position_size),
                        format!("{:.4}", r.risk_score),
                        r.approved.to_string(),
                    ]
                })
                .collect(),
        ),
    ));

    tables.push((
        "AI Trading Insights:".to_string(),
        render_table(
            &[
                "symbol",
                "market_sentiment",
                "risk_assessment",
                "trading_recommendation",
                "confidence_score",
            ],
            report
                .insights
                .iter()
                .map(|i| {
                    vec![
                        i.symbol().to_string(),
                        i.market_sentiment.to_string(),
                        i.risk_assessment.to_string(),
                        i.trading_recommendation.to_string(),
                        format!("{:.4}", i.confidence_score),
                    ]
                })
                .collect(),
        ),
    ));

    tables.push((
        "Trading Alerts:".to_string(),
        render_table(
            &["symbol", "signal_type", "position_size", "alert_time", "alert_message"],
            report
                .alerts
                .iter()
                .map(|a| {
                    vec![
                        a.symbol.clone(),
                        a.signal_type.to_string(),
                        format!("{:.2}", a.position_size),
                        a.alert_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                        a.alert_message.clone(),
                    ]
                })
                .collect(),
        ),
    ));

    if !report.commentary.is_empty() {
        let text = report
            .commentary
            .iter()
            .map(|c| format!("Stock: {}\nAnalysis: {}", c.symbol, c.analysis))
            .collect::<Vec<_>>()
            .join("\n\n");
        tables.push(("LLM-Powered Trading Insights:".to_string(), text));
    }

    if !report.portfolio.is_empty() {
        tables.push((
            "Portfolio Summary:".to_string(),
            render_table(
                &["symbol", "trading_recommendation", "confidence_score", "portfolio_allocation"],
                report
                    .portfolio
                    .iter()
                    .map(|p| {
                        vec![
                            p.symbol.clone(),
                            p.trading_recommendation.to_string(),
                            format!("{:.4}", p.confidence_score),
                            p.portfolio_allocation.to_string(),
                        ]
                    })
                    .collect(),
            ),
        ));
    }

    tables
}

/// Left-aligned fixed-width table. An empty row set renders headers only.
pub fn render_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(headers.iter().map(|h| h.to_string()).collect()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in rows {
        lines.push(format_row(row));
    }

    lines.join("\n")
}
