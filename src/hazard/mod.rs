//! Hazard assessment
//!
//! Turns a 36-step forecast into the condensed outlook pushed to the mesh:
//! - [`aggregator`]: hourly averages of the forecast
//! - [`classifier`]: per-step labels, overall status, key alerts
//! - [`thresholds`]: the injected limit table

pub mod aggregator;
pub mod classifier;
pub mod thresholds;

pub use aggregator::aggregate;
pub use classifier::{critical_alerts, HazardClassifier};
pub use thresholds::{HazardThresholds, HumidityLimits, UpperLimits};

use crate::types::{Forecast, HazardSummary, HourlyBucket, Levels};

/// Decimal places kept in the summary document.
pub const SUMMARY_PRECISION: i32 = 2;

/// Build the summary for one cycle.
///
/// `current` is the most recent input sample; `timestamp` is stamped
/// verbatim into the document.
pub fn build_summary(
    classifier: &HazardClassifier,
    forecast: &Forecast,
    current: Levels,
    timestamp: String,
) -> HazardSummary {
    let (status, alerts) = classifier.classify_summary(forecast);
    let forecast = aggregate(forecast)
        .into_iter()
        .enumerate()
        .map(|(i, avg)| HourlyBucket::new(i + 1, avg.rounded(SUMMARY_PRECISION)))
        .collect();

    HazardSummary {
        timestamp,
        status,
        current: current.rounded(SUMMARY_PRECISION),
        forecast,
        alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertLabel, HazardStatus, FORECAST_STEPS};

    #[test]
    fn test_constant_safe_forecast_summary() {
        let levels = Levels::from_row([10.0, 500.0, 10.0, 22.0, 50.0]);
        let summary = build_summary(
            &HazardClassifier::default(),
            &Forecast::constant(levels),
            levels,
            "2026-01-01T00:00:00".to_string(),
        );
        assert_eq!(summary.status, HazardStatus::Safe);
        assert_eq!(summary.alerts, vec![AlertLabel::NoHazardsDetected]);
        assert_eq!(summary.current, levels);
        assert_eq!(summary.forecast.len(), 6);
        for (i, bucket) in summary.forecast.iter().enumerate() {
            assert_eq!(bucket.hour, i + 1);
            assert_eq!(bucket.levels(), levels);
        }
    }

    #[test]
    fn test_summary_document_shape() {
        let mut rows = vec![vec![10.0, 500.0, 10.0, 22.0, 50.0]; FORECAST_STEPS];
        for row in &mut rows {
            row[2] = 250.123_456;
        }
        let forecast = Forecast::from_rows(&rows).unwrap();
        let current = Levels::from_row([1.234_5, 2.0, 3.0, 4.0, 5.0]);
        let summary = build_summary(&HazardClassifier::default(), &forecast, current, "t".into());

        let v = serde_json::to_value(&summary).unwrap();
        assert_eq!(v["timestamp"], "t");
        assert_eq!(v["status"], "Danger");
        assert_eq!(v["current"]["NH3"], 1.23);
        assert_eq!(v["forecast"][0]["avg_CO"], 250.12);
        assert_eq!(v["alerts"][0], "🚨 CO life-threatening—Seek fresh air now!");
    }
}
