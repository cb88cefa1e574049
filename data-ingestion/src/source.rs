//! Market-data collaborator seam and batch assembly

use async_trait::async_trait;
use common::{Observation, PipelineError};
use tracing::{info, warn};

/// Anything that can produce the latest observation for a symbol
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the most recent snapshot for `symbol`.
    ///
    /// Fails with `DataUnavailable` for transport or provider errors and
    /// `MalformedObservation` when the payload cannot become a valid record.
    async fn fetch_latest(&self, symbol: &str) -> Result<Observation, PipelineError>;
}

/// Fetch one observation per symbol, in order, omitting failures.
///
/// A batch where every symbol failed is an empty, successful batch.
pub async fn fetch_batch<S>(source: &S, symbols: &[String]) -> Vec<Observation>
where
    S: MarketDataSource + ?Sized,
{
    let mut observations = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let result = source
            .fetch_latest(symbol)
            .await
            .and_then(|obs| obs.validate().map(|_| obs));

        match result {
            Ok(obs) => observations.push(obs),
            Err(e) => warn!(symbol = %symbol, error = %e, "Skipping symbol"),
        }
    }

    info!(
        fetched = observations.len(),
        requested = symbols.len(),
        "Market data batch assembled"
    );

    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticSource {
        quotes: HashMap<String, Observation>,
    }

    #[async_trait]
    impl MarketDataSource for StaticSource {
        async fn fetch_latest(&self, symbol: &str) -> Result<Observation, PipelineError> {
            self.quotes
                .get(symbol)
                .cloned()
                .ok_or_else(|| PipelineError::unavailable(symbol, "no quote"))
        }
    }

    fn quote(symbol: &str, price: f64) -> Observation {
        Observation {
            symbol: symbol.to_string(),
            price,
            volume: 500,
            timestamp: 1,
            change_percent: 0.1,
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failing_symbols_are_omitted() {
        let mut quotes = HashMap::new();
        quotes.insert("AAPL".to_string(), quote("AAPL", 150.0));
        quotes.insert("MSFT".to_string(), quote("MSFT", 300.0));
        let source = StaticSource { quotes };

        let batch = fetch_batch(&source, &symbols(&["AAPL", "GOOGL", "MSFT"])).await;

        let fetched: Vec<&str> = batch.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(fetched, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_malformed_observations_are_dropped() {
        let mut quotes = HashMap::new();
        quotes.insert("AAPL".to_string(), quote("AAPL", -1.0));
        quotes.insert("TSLA".to_string(), quote("TSLA", 250.0));
        let source = StaticSource { quotes };

        let batch = fetch_batch(&source, &symbols(&["AAPL", "TSLA"])).await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].symbol, "TSLA");
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_batch() {
        let source = StaticSource {
            quotes: HashMap::new(),
        };
        let batch = fetch_batch(&source, &symbols(&["AAPL", "GOOGL"])).await;
        assert!(batch.is_empty());
    }
}
