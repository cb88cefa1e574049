use anyhow::{bail, Context, Result};
use data_ingestion::PolygonConnector;
use monitoring::{JsonLinesSink, TracingReportSink};
use research_agents::ChatCompletionsEngine;
use signal_generation::{create_config_template, FinancialPipeline, PipelineSettings, RunMode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: financial-pipeline [--once | --continuous] [--config PATH] \
[--report-file PATH] [--init-config PATH]";

#[derive(Debug, Default)]
struct Args {
    mode: Option<RunMode>,
    config: Option<PathBuf>,
    report_file: Option<PathBuf>,
    init_config: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--once" => parsed.mode = Some(RunMode::Once),
            "--continuous" => parsed.mode = Some(RunMode::Continuous),
            "--config" => parsed.config = Some(path_value(&mut args, "--config")?),
            "--report-file" => parsed.report_file = Some(path_value(&mut args, "--report-file")?),
            "--init-config" => parsed.init_config = Some(path_value(&mut args, "--init-config")?),
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("Unknown argument: {}\n{}", other, USAGE),
        }
    }
    Ok(parsed)
}

fn path_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<PathBuf> {
    args.next()
        .map(PathBuf::from)
        .with_context(|| format!("{} requires a path", flag))
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args(std::env::args().skip(1))?;

    if let Some(path) = &args.init_config {
        create_config_template(path)?;
        info!("Wrote configuration template to {}", path.display());
        return Ok(());
    }

    let mut settings = PipelineSettings::load(args.config.as_deref())?
        .with_api_keys(env_key("POLYGON_API_KEY"), env_key("GROQ_API_KEY"));
    if let Some(mode) = args.mode {
        settings.schedule.mode = mode;
    }

    if settings.market_data.api_key.is_empty() {
        bail!("POLYGON_API_KEY is not set");
    }

    info!("🚀 Starting Financial AI Analysis");
    info!("Symbols: {:?}", settings.schedule.symbols);

    let source = Arc::new(PolygonConnector::new(settings.market_data.clone())?);
    let engine = ChatCompletionsEngine::from_config(&settings.reasoning)?;
    let mode = settings.schedule.mode;

    let mut pipeline = FinancialPipeline::new(settings, source)?
        .add_sink(Box::new(TracingReportSink::new()));
    match engine {
        Some(engine) => pipeline = pipeline.with_reasoning(Arc::new(engine)),
        None => warn!("GROQ_API_KEY not set or reasoning disabled; skipping commentary"),
    }
    if let Some(path) = args.report_file {
        info!("Appending reports to {}", path.display());
        pipeline = pipeline.add_sink(Box::new(JsonLinesSink::new(path)));
    }

    match mode {
        RunMode::Once => {
            let report = pipeline.run_once().await?;
            info!(
                "✅ Run {} complete: {} alerts from {} observations",
                report.run_id,
                report.alerts.len(),
                report.observations.len()
            );
        }
        RunMode::Continuous => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("👋 Shutdown requested, finishing current run...");
                        let _ = shutdown_tx.send(true);
                    }
                    Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
                }
            });

            let runs = pipeline.run_continuous(shutdown_rx).await;
            info!("Completed {} run(s)", runs);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_flags() {
        let parsed = args(&["--continuous", "--config", "cfg.toml", "--report-file", "out.jsonl"]).unwrap();
        assert_eq!(parsed.mode, Some(RunMode::Continuous));
        assert_eq!(parsed.config, Some(PathBuf::from("cfg.toml")));
        assert_eq!(parsed.report_file, Some(PathBuf::from("out.jsonl")));
    }

    #[test]
    fn test_missing_path_and_unknown_flag() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--bogus"]).is_err());
        assert!(args(&[]).unwrap().mode.is_none());
    }
}
