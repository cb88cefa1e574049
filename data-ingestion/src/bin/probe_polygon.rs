use data_ingestion::{fetch_batch, MarketDataConfig, MarketDataSource, PolygonConnector};
use tracing::{error, info};
use tracing_subscriber::fmt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_max_level(tracing::Level::INFO).init();

    // Run with: POLYGON_API_KEY=... cargo run --bin probe_polygon -- AAPL GOOGL
    let api_key = std::env::var("POLYGON_API_KEY")
        .map_err(|_| anyhow::anyhow!("POLYGON_API_KEY is not set"))?;

    let mut symbols: Vec<String> = std::env::args().skip(1).collect();
    if symbols.is_empty() {
        symbols = vec!["AAPL".to_string(), "GOOGL".to_string()];
    }

    let connector = PolygonConnector::new(MarketDataConfig {
        api_key,
        ..Default::default()
    })?;

    info!("Testing individual stock data for {}", symbols[0]);
    match connector.fetch_latest(&symbols[0]).await {
        Ok(obs) => info!("Stock data: {:?}", obs),
        Err(e) => error!("Fetch failed: {}", e),
    }

    info!("Testing batch fetch for {:?}", symbols);
    let batch = fetch_batch(&connector, &symbols).await;
    for obs in &batch {
        info!(
            "{:<6} price={:>10.2} volume={:>12} change={:>7.3}%",
            obs.symbol, obs.price, obs.volume, obs.change_percent
        );
    }

    info!("Probe complete. {} of {} symbols fetched.", batch.len(), symbols.len());
    Ok(())
}
