use chrono::{DateTime, Utc};
use common::{Alert, RiskAdjustedSignal};
use tracing::info;
use uuid::Uuid;

/// Projects approved records into alert events.
///
/// Alerts are not deduplicated across runs: the same approved record produces
/// a fresh alert every time it is seen.
#[derive(Debug, Clone, Default)]
pub struct AlertGenerator;

impl AlertGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Alerts stamped with the current wall-clock time
    pub fn generate_alerts(&self, records: &[RiskAdjustedSignal]) -> Vec<Alert> {
        self.generate_alerts_at(records, Utc::now())
    }

    pub fn generate_alerts_at(
        &self,
        records: &[RiskAdjustedSignal],
        alert_time: DateTime<Utc>,
    ) -> Vec<Alert> {
        let alerts: Vec<Alert> = records
            .iter()
            .filter(|r| r.approved)
            .map(|r| Alert {
                id: Uuid::new_v4(),
                symbol: r.symbol().to_string(),
                price: r.price(),
                signal_type: r.signal_type(),
                signal_strength: r.signal_strength(),
                position_size: r.position_size,
                risk_score: r.risk_score,
                alert_time,
                alert_message: alert_message(r),
            })
            .collect();

        for alert in &alerts {
            info!(
                symbol = %alert.symbol,
                signal_type = %alert.signal_type,
                strength = alert.signal_strength,
                "🚨 {}",
                alert.alert_message
            );
        }

        alerts
    }
}

pub fn alert_message(record: &RiskAdjustedSignal) -> String {
    format!("{} {} signal detected!", record.symbol(), record.signal_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::{Observation, Signal, SignalType};

    fn record(symbol: &str, strength: f64, approved: bool) -> RiskAdjustedSignal {
        RiskAdjustedSignal {
            signal: Signal {
                observation: Observation {
                    symbol: symbol.to_string(),
                    price: 150.0,
                    volume: 2_000_000,
                    timestamp: 1_700_000_000_000,
                    change_percent: strength,
                },
                signal_type: SignalType::Buy,
                signal_strength: strength,
            },
            position_size: strength * 1000.0,
            risk_score: strength / 5.0,
            approved,
        }
    }

    #[test]
    fn test_only_approved_records_alert() {
        let records = vec![
            record("AAPL", 2.0, true),
            record("GOOGL", 1.2, false),
            record("TSLA", 3.1, true),
        ];

        let alerts = AlertGenerator::new().generate_alerts(&records);

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].symbol, "AAPL");
        assert_eq!(alerts[1].symbol, "TSLA");
        for alert in &alerts {
            assert_eq!(alert.signal_type, SignalType::Buy);
        }
    }

    #[test]
    fn test_alert_fields() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap();
        let alerts = AlertGenerator::new().generate_alerts_at(&[record("AAPL", 2.0, true)], at);

        let alert = &alerts[0];
        assert_eq!(alert.alert_message, "AAPL BUY signal detected!");
        assert_eq!(alert.alert_time, at);
        assert_eq!(alert.price, 150.0);
        assert_eq!(alert.position_size, 2000.0);
        assert_eq!(alert.risk_score, 0.4);
    }

    #[test]
    fn test_reruns_are_not_deduplicated() {
        let generator = AlertGenerator::new();
        let records = vec![record("MSFT", 1.8, true)];

        let first = generator.generate_alerts(&records);
        let second = generator.generate_alerts(&records);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].id, second[0].id);
        assert_eq!(first[0].alert_message, second[0].alert_message);
    }

    #[test]
    fn test_empty_batch() {
        assert!(AlertGenerator::new().generate_alerts(&[]).is_empty());
    }
}
