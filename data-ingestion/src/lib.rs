//! Market data ingestion (Layer 0)
//!
//! Fetches one snapshot per configured symbol and hands the pipeline a batch
//! of validated observations.

pub mod connectors;
pub mod source;

pub use connectors::{MarketDataConfig, PolygonConnector};
pub use source::{fetch_batch, MarketDataSource};
