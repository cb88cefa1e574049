//! Insight annotation - descriptive labels for risk-adjusted signals
//!
//! Labels depend only on the record's own fields, so annotating the same
//! record twice always yields the same insight.

use crate::bands::BandTable;
use common::{
    Insight, MarketSentiment, PortfolioAllocation, PortfolioEntry, RiskAdjustedSignal,
    RiskAssessment, TradingRecommendation,
};
use tracing::debug;

/// Volume divisor for the confidence score
pub const VOLUME_SCALE: f64 = 1_000_000.0;

/// Market sentiment by signal strength
pub fn sentiment_bands() -> BandTable<MarketSentiment> {
    BandTable::new(
        &[
            (2.0, MarketSentiment::StrongBullish),
            (1.0, MarketSentiment::ModeratePositive),
        ],
        MarketSentiment::Weak,
    )
}

/// Risk assessment by risk score
pub fn risk_bands() -> BandTable<RiskAssessment> {
    BandTable::new(
        &[(0.5, RiskAssessment::High), (0.2, RiskAssessment::Moderate)],
        RiskAssessment::Low,
    )
}

/// Recommendation by signal strength, consulted for approved records only
pub fn recommendation_bands() -> BandTable<TradingRecommendation> {
    BandTable::new(
        &[(2.5, TradingRecommendation::StrongBuy)],
        TradingRecommendation::Buy,
    )
}

/// Portfolio allocation by confidence score
pub fn allocation_bands() -> BandTable<PortfolioAllocation> {
    BandTable::new(
        &[
            (1000.0, PortfolioAllocation::Large),
            (500.0, PortfolioAllocation::Medium),
        ],
        PortfolioAllocation::Small,
    )
}

/// Attaches sentiment, risk and recommendation labels to records
#[derive(Debug, Clone)]
pub struct InsightAnnotator {
    sentiment: BandTable<MarketSentiment>,
    risk: BandTable<RiskAssessment>,
    recommendation: BandTable<TradingRecommendation>,
    allocation: BandTable<PortfolioAllocation>,
}

impl InsightAnnotator {
    pub fn new() -> Self {
        Self {
            sentiment: sentiment_bands(),
            risk: risk_bands(),
            recommendation: recommendation_bands(),
            allocation: allocation_bands(),
        }
    }

    pub fn annotate(&self, record: &RiskAdjustedSignal) -> Insight {
        let strength = record.signal_strength();

        let trading_recommendation = if record.approved {
            self.recommendation.classify(strength)
        } else {
            TradingRecommendation::Hold
        };

        Insight {
            record: record.clone(),
            market_sentiment: self.sentiment.classify(strength),
            risk_assessment: self.risk.classify(record.risk_score),
            trading_recommendation,
            confidence_score: confidence_score(strength, record.volume()),
        }
    }

    pub fn annotate_batch(&self, records: &[RiskAdjustedSignal]) -> Vec<Insight> {
        let insights: Vec<Insight> = records.iter().map(|r| self.annotate(r)).collect();
        debug!("Annotated {} records", insights.len());
        insights
    }

    /// Allocation view over the approved insights.
    pub fn summarize_portfolio(&self, insights: &[Insight]) -> Vec<PortfolioEntry> {
        insights
            .iter()
            .filter(|i| i.record.approved)
            .map(|i| PortfolioEntry {
                symbol: i.symbol().to_string(),
                trading_recommendation: i.trading_recommendation,
                confidence_score: i.confidence_score,
                market_sentiment: i.market_sentiment,
                risk_assessment: i.risk_assessment,
                position_size: i.record.position_size,
                portfolio_allocation: self.allocation.classify(i.confidence_score),
            })
            .collect()
    }
}

impl Default for InsightAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

/// `strength * volume / 1e6`.
///
/// Strength is a percentage move, not a normalised score, so the result is
/// not bounded; negative strength gives negative confidence.
pub fn confidence_score(signal_strength: f64, volume: u64) -> f64 {
    signal_strength * (volume as f64 / VOLUME_SCALE)
}
