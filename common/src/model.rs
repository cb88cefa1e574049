//! Records that flow through the signal pipeline.
//!
//! Every stage wraps the record produced by the stage before it, so a later
//! record always carries the full chain of fields it was derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::PipelineError;

/// Directional classification of a price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
            SignalType::Hold => "HOLD",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One symbol's price/volume snapshot at fetch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub symbol: String,
    pub price: f64,
    pub volume: u64,
    /// Provider-defined epoch unit (milliseconds for Polygon aggregates)
    pub timestamp: i64,
    /// Signed percentage move since the provider's reference price
    pub change_percent: f64,
}

impl Observation {
    /// Reject records that must not enter the pipeline.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.symbol.trim().is_empty() {
            return Err(PipelineError::malformed(&self.symbol, "symbol is empty"));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(PipelineError::malformed(
                &self.symbol,
                format!("price must be positive, got {}", self.price),
            ));
        }
        if !self.change_percent.is_finite() {
            return Err(PipelineError::malformed(
                &self.symbol,
                format!("change_percent is not finite: {}", self.change_percent),
            ));
        }
        Ok(())
    }
}

/// An observation annotated with a direction and a strength
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(flatten)]
    pub observation: Observation,
    pub signal_type: SignalType,
    /// Equal to `change_percent`. Not direction-normalised: a large drop is a
    /// large negative strength.
    pub signal_strength: f64,
}

impl Signal {
    pub fn symbol(&self) -> &str {
        &self.observation.symbol
    }
}

/// A signal that survived the retention filter, with sizing and approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAdjustedSignal {
    #[serde(flatten)]
    pub signal: Signal,
    pub position_size: f64,
    pub risk_score: f64,
    pub approved: bool,
}

impl RiskAdjustedSignal {
    pub fn symbol(&self) -> &str {
        self.signal.symbol()
    }

    pub fn signal_type(&self) -> SignalType {
        self.signal.signal_type
    }

    pub fn signal_strength(&self) -> f64 {
        self.signal.signal_strength
    }

    pub fn price(&self) -> f64 {
        self.signal.observation.price
    }

    pub fn volume(&self) -> u64 {
        self.signal.observation.volume
    }
}

/// Declares a label enum whose variants render as fixed strings.
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum!(
    /// Descriptive read of the signal strength
    MarketSentiment {
        StrongBullish => "Strong Bullish Momentum",
        ModeratePositive => "Moderate Positive Movement",
        Weak => "Weak Signal - Monitor Closely",
    }
);

label_enum!(
    /// Descriptive read of the risk score
    RiskAssessment {
        High => "High Risk - Hold Position",
        Moderate => "Moderate Risk - Monitor Closely",
        Low => "Low Risk - Consider Entry",
    }
);

label_enum!(
    TradingRecommendation {
        StrongBuy => "Strong BUY - High Confidence",
        Buy => "BUY - Good Opportunity",
        Hold => "HOLD - Wait for Better Entry",
    }
);

label_enum!(
    /// Suggested share of the portfolio for an approved insight
    PortfolioAllocation {
        Large => "Allocate 5-10% of portfolio",
        Medium => "Allocate 2-5% of portfolio",
        Small => "Allocate 1-2% of portfolio",
    }
);

/// A risk-adjusted signal with descriptive labels and a confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(flatten)]
    pub record: RiskAdjustedSignal,
    pub market_sentiment: MarketSentiment,
    pub risk_assessment: RiskAssessment,
    pub trading_recommendation: TradingRecommendation,
    pub confidence_score: f64,
}

impl Insight {
    pub fn symbol(&self) -> &str {
        self.record.symbol()
    }
}

/// Approved insight projected for allocation review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub symbol: String,
    pub trading_recommendation: TradingRecommendation,
    pub confidence_score: f64,
    pub market_sentiment: MarketSentiment,
    pub risk_assessment: RiskAssessment,
    pub position_size: f64,
    pub portfolio_allocation: PortfolioAllocation,
}

/// User-facing notification for an approved signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub symbol: String,
    pub price: f64,
    pub signal_type: SignalType,
    pub signal_strength: f64,
    pub position_size: f64,
    pub risk_score: f64,
    /// Wall-clock time the alert was generated, not the observation time
    pub alert_time: DateTime<Utc>,
    pub alert_message: String,
}

/// Free-text analysis for one approved record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commentary {
    pub symbol: String,
    pub analysis: String,
    pub original_signal: RiskAdjustedSignal,
}

/// Every batch produced by one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub observations: Vec<Observation>,
    pub signals: Vec<Signal>,
    pub risk_adjusted: Vec<RiskAdjustedSignal>,
    pub insights: Vec<Insight>,
    pub alerts: Vec<Alert>,
    pub commentary: Vec<Commentary>,
    pub portfolio: Vec<PortfolioEntry>,
}

impl PipelineReport {
    pub fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            observations: Vec::new(),
            signals: Vec::new(),
            risk_adjusted: Vec::new(),
            insights: Vec::new(),
            alerts: Vec::new(),
            commentary: Vec::new(),
            portfolio: Vec::new(),
        }
    }

    pub fn approved_count(&self) -> usize {
        self.risk_adjusted.iter().filter(|r| r.approved).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(symbol: &str, price: f64) -> Observation {
        Observation {
            symbol: symbol.to_string(),
            price,
            volume: 1_000,
            timestamp: 1_700_000_000_000,
            change_percent: 0.5,
        }
    }

    #[test]
    fn test_signal_type_display() {
        assert_eq!(SignalType::Buy.to_string(), "BUY");
        assert_eq!(SignalType::Sell.to_string(), "SELL");
        assert_eq!(SignalType::Hold.to_string(), "HOLD");
        assert_eq!(serde_json::to_string(&SignalType::Buy).unwrap(), "\"BUY\"");
    }

    #[test]
    fn test_label_serialization_uses_display_text() {
        let json = serde_json::to_string(&RiskAssessment::Moderate).unwrap();
        assert_eq!(json, "\"Moderate Risk - Monitor Closely\"");
        let parsed: TradingRecommendation =
            serde_json::from_str("\"HOLD - Wait for Better Entry\"").unwrap();
        assert_eq!(parsed, TradingRecommendation::Hold);
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(observation("AAPL", 150.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_records() {
        assert!(matches!(
            observation("AAPL", 0.0).validate(),
            Err(PipelineError::MalformedObservation { .. })
        ));
        assert!(observation("AAPL", f64::NAN).validate().is_err());
        assert!(observation("  ", 10.0).validate().is_err());

        let mut obs = observation("MSFT", 10.0);
        obs.change_percent = f64::INFINITY;
        assert!(obs.validate().is_err());
    }

    #[test]
    fn test_signal_serializes_flat() {
        let signal = Signal {
            observation: observation("TSLA", 200.0),
            signal_type: SignalType::Hold,
            signal_strength: 0.5,
        };
        let value = serde_json::to_value(&signal).unwrap();
        assert_eq!(value["symbol"], "TSLA");
        assert_eq!(value["signal_type"], "HOLD");
    }
}
