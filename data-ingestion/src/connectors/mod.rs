pub mod polygon;

pub use polygon::{MarketDataConfig, PolygonConnector};
