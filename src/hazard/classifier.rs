//! Threshold classification of forecast steps and whole forecasts

use crate::types::{AlertLabel, Forecast, ForecastStep, HazardStatus, Severity, FORECAST_STEPS};

use super::thresholds::{HazardThresholds, UpperLimits};

/// Alerting steps above this count (more than half the window) mean Danger.
pub const DANGER_STEP_COUNT: usize = FORECAST_STEPS / 2;

/// Alerting steps above this count (more than a sixth) mean Warning.
pub const WARNING_STEP_COUNT: usize = FORECAST_STEPS / 6;

/// Most labels carried into a summary.
pub const MAX_SUMMARY_ALERTS: usize = 3;

/// Stateless classifier over an injected threshold table.
#[derive(Debug, Clone, Default)]
pub struct HazardClassifier {
    thresholds: HazardThresholds,
}

impl HazardClassifier {
    pub const fn new(thresholds: HazardThresholds) -> Self {
        Self { thresholds }
    }

    pub const fn thresholds(&self) -> &HazardThresholds {
        &self.thresholds
    }

    /// Labels for one step, in channel order.
    ///
    /// Each channel contributes at most one label and danger wins over
    /// warning. Never empty: a step with no crossing yields
    /// [`AlertLabel::AllClear`].
    pub fn classify_step(&self, step: &ForecastStep) -> Vec<AlertLabel> {
        let t = &self.thresholds;
        let levels = step.levels();
        let mut labels = Vec::with_capacity(5);

        let upper = |value: f64, limits: UpperLimits, danger: AlertLabel, warning: AlertLabel| {
            if value > limits.danger {
                Some(danger)
            } else if value > limits.warning {
                Some(warning)
            } else {
                None
            }
        };

        labels.extend(upper(levels.nh3, t.nh3, AlertLabel::Nh3Danger, AlertLabel::Nh3Warning));
        labels.extend(upper(levels.ch4, t.ch4, AlertLabel::Ch4Danger, AlertLabel::Ch4Warning));
        labels.extend(upper(levels.co, t.co, AlertLabel::CoDanger, AlertLabel::CoWarning));
        labels.extend(upper(levels.temp, t.temp, AlertLabel::TempDanger, AlertLabel::TempWarning));

        let h = levels.humidity;
        let humidity = if h < t.humidity.danger_low {
            Some(AlertLabel::HumidityDangerLow)
        } else if h < t.humidity.warning_low {
            Some(AlertLabel::HumidityWarningLow)
        } else if h > t.humidity.danger_high {
            Some(AlertLabel::HumidityDangerHigh)
        } else if h > t.humidity.warning_high {
            Some(AlertLabel::HumidityWarningHigh)
        } else {
            None
        };
        labels.extend(humidity);

        if labels.is_empty() {
            labels.push(AlertLabel::AllClear);
        }
        labels
    }

    /// Overall status and key alerts for a full forecast.
    ///
    /// Labels are deduplicated in first-seen order (step, then channel) and
    /// capped at [`MAX_SUMMARY_ALERTS`]. No alerts at all yields
    /// [`AlertLabel::NoHazardsDetected`].
    pub fn classify_summary(&self, forecast: &Forecast) -> (HazardStatus, Vec<AlertLabel>) {
        let mut alerting_steps = 0usize;
        let mut seen: Vec<AlertLabel> = Vec::new();

        for step in forecast.steps() {
            let labels = self.classify_step(step);
            let mut step_alerts = labels.into_iter().filter(|l| l.is_alert()).peekable();
            if step_alerts.peek().is_some() {
                alerting_steps += 1;
            }
            for label in step_alerts {
                if !seen.contains(&label) {
                    seen.push(label);
                }
            }
        }

        let status = status_for(alerting_steps);
        seen.truncate(MAX_SUMMARY_ALERTS);
        if seen.is_empty() {
            seen.push(AlertLabel::NoHazardsDetected);
        }
        (status, seen)
    }
}

/// Map the number of alerting steps onto a status level.
pub const fn status_for(alerting_steps: usize) -> HazardStatus {
    if alerting_steps > DANGER_STEP_COUNT {
        HazardStatus::Danger
    } else if alerting_steps > WARNING_STEP_COUNT {
        HazardStatus::Warning
    } else {
        HazardStatus::Safe
    }
}

/// Danger-level labels only, as pushed out by the critical-alert endpoint.
pub fn critical_alerts(labels: &[AlertLabel]) -> Vec<AlertLabel> {
    labels
        .iter()
        .copied()
        .filter(|l| l.severity() == Severity::Danger)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Levels;

    fn safe() -> Levels {
        Levels {
            nh3: 10.0,
            ch4: 500.0,
            co: 10.0,
            temp: 22.0,
            humidity: 50.0,
        }
    }

    fn step(levels: Levels) -> ForecastStep {
        ForecastStep::new(levels)
    }

    /// Forecast whose first `alerting` steps carry a CO warning.
    fn forecast_with_alerting_steps(alerting: usize) -> Forecast {
        let mut rows = vec![safe(); FORECAST_STEPS];
        for row in rows.iter_mut().take(alerting) {
            row.co = 50.0;
        }
        Forecast::from_levels(&rows).unwrap()
    }

    #[test]
    fn test_safe_step_is_all_clear() {
        let c = HazardClassifier::default();
        assert_eq!(c.classify_step(&step(safe())), vec![AlertLabel::AllClear]);
    }

    #[test]
    fn test_danger_supersedes_warning() {
        let c = HazardClassifier::default();
        let labels = c.classify_step(&step(Levels { nh3: 75.0, ..safe() }));
        assert_eq!(labels, vec![AlertLabel::Nh3Danger]);
        assert!(!labels.contains(&AlertLabel::Nh3Warning));
    }

    #[test]
    fn test_limits_are_strict() {
        let c = HazardClassifier::default();
        // Exactly at a limit does not cross it.
        let at_limits = Levels {
            nh3: 25.0,
            ch4: 1_000.0,
            co: 35.0,
            temp: 30.0,
            humidity: 30.0,
        };
        assert_eq!(c.classify_step(&step(at_limits)), vec![AlertLabel::AllClear]);
        let h = Levels { humidity: 70.0, ..safe() };
        assert_eq!(c.classify_step(&step(h)), vec![AlertLabel::AllClear]);
    }

    #[test]
    fn test_one_label_per_channel_in_channel_order() {
        let c = HazardClassifier::default();
        let levels = Levels {
            nh3: 30.0,
            ch4: 60_000.0,
            co: 40.0,
            temp: 36.0,
            humidity: 85.0,
        };
        assert_eq!(
            c.classify_step(&step(levels)),
            vec![
                AlertLabel::Nh3Warning,
                AlertLabel::Ch4Danger,
                AlertLabel::CoWarning,
                AlertLabel::TempDanger,
                AlertLabel::HumidityDangerHigh,
            ]
        );
    }

    #[test]
    fn test_humidity_priority() {
        let c = HazardClassifier::default();
        let at = |h: f64| c.classify_step(&step(Levels { humidity: h, ..safe() }));
        assert_eq!(at(10.0), vec![AlertLabel::HumidityDangerLow]);
        assert_eq!(at(25.0), vec![AlertLabel::HumidityWarningLow]);
        assert_eq!(at(75.0), vec![AlertLabel::HumidityWarningHigh]);
        assert_eq!(at(90.0), vec![AlertLabel::HumidityDangerHigh]);
        // Clamped negative humidity is exactly zero, which is very dry.
        assert_eq!(at(-4.0), vec![AlertLabel::HumidityDangerLow]);
    }

    #[test]
    fn test_injected_thresholds_change_severity() {
        let mut thresholds = HazardThresholds::default();
        thresholds.temp = UpperLimits { warning: 20.0, danger: 21.0 };
        let c = HazardClassifier::new(thresholds);
        assert_eq!(c.classify_step(&step(safe())), vec![AlertLabel::TempDanger]);
    }

    #[test]
    fn test_classify_step_never_empty() {
        let c = HazardClassifier::default();
        for h in [0.0, 15.0, 25.0, 50.0, 75.0, 95.0] {
            for co in [0.0, 40.0, 250.0] {
                let labels = c.classify_step(&step(Levels { humidity: h, co, ..safe() }));
                assert!(!labels.is_empty());
            }
        }
    }

    #[test]
    fn test_status_boundaries() {
        let c = HazardClassifier::default();
        let status = |n| c.classify_summary(&forecast_with_alerting_steps(n)).0;
        assert_eq!(status(0), HazardStatus::Safe);
        assert_eq!(status(6), HazardStatus::Safe);
        assert_eq!(status(7), HazardStatus::Warning);
        assert_eq!(status(18), HazardStatus::Warning);
        assert_eq!(status(19), HazardStatus::Danger);
        assert_eq!(status(36), HazardStatus::Danger);
    }

    #[test]
    fn test_summary_labels_first_seen_and_capped() {
        let c = HazardClassifier::default();
        let mut rows = vec![safe(); FORECAST_STEPS];
        rows[2].humidity = 75.0;
        rows[5].co = 40.0;
        rows[5].nh3 = 30.0;
        rows[9].temp = 40.0;
        rows[12].co = 40.0;
        let forecast = Forecast::from_levels(&rows).unwrap();
        let (status, labels) = c.classify_summary(&forecast);
        assert_eq!(status, HazardStatus::Safe);
        assert_eq!(
            labels,
            vec![
                AlertLabel::HumidityWarningHigh,
                AlertLabel::Nh3Warning,
                AlertLabel::CoWarning,
            ]
        );
    }

    #[test]
    fn test_summary_without_alerts_reports_no_hazards() {
        let c = HazardClassifier::default();
        let (status, labels) = c.classify_summary(&Forecast::constant(safe()));
        assert_eq!(status, HazardStatus::Safe);
        assert_eq!(labels, vec![AlertLabel::NoHazardsDetected]);
    }

    #[test]
    fn test_summary_is_deterministic() {
        let c = HazardClassifier::default();
        let forecast = Forecast::constant(Levels {
            nh3: 60.0,
            ch4: 2_000.0,
            co: 300.0,
            temp: 33.0,
            humidity: 10.0,
        });
        let first = c.classify_summary(&forecast);
        for _ in 0..10 {
            assert_eq!(c.classify_summary(&forecast), first);
        }
        assert_eq!(
            first.1,
            vec![AlertLabel::Nh3Danger, AlertLabel::Ch4Warning, AlertLabel::CoDanger]
        );
    }

    #[test]
    fn test_critical_alerts_filters_danger() {
        let labels = [
            AlertLabel::CoDanger,
            AlertLabel::TempWarning,
            AlertLabel::HumidityDangerLow,
        ];
        assert_eq!(
            critical_alerts(&labels),
            vec![AlertLabel::CoDanger, AlertLabel::HumidityDangerLow]
        );
        assert!(critical_alerts(&[AlertLabel::NoHazardsDetected]).is_empty());
    }
}
