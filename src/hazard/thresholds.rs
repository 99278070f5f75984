//! Human-exposure limits per channel (OSHA/EPA/WHO derived)
//!
//! Every struct implements `Default` with the deployed limits so a missing
//! `[thresholds]` section in the config file changes nothing.

use serde::{Deserialize, Serialize};

/// Limits for a channel that is only hazardous when high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpperLimits {
    pub warning: f64,
    pub danger: f64,
}

/// Humidity is hazardous both when too dry and when too damp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HumidityLimits {
    /// Below this: dry air (%)
    pub warning_low: f64,
    /// Below this: very dry (%)
    pub danger_low: f64,
    /// Above this: humid (%)
    pub warning_high: f64,
    /// Above this: very humid, mold risk (%)
    pub danger_high: f64,
}

impl Default for HumidityLimits {
    fn default() -> Self {
        Self {
            warning_low: 30.0,
            danger_low: 20.0,
            warning_high: 70.0,
            danger_high: 80.0,
        }
    }
}

/// Complete threshold table handed to the classifier at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardThresholds {
    /// Ammonia (ppm)
    #[serde(default = "default_nh3")]
    pub nh3: UpperLimits,
    /// Methane (ppm)
    #[serde(default = "default_ch4")]
    pub ch4: UpperLimits,
    /// Carbon monoxide (ppm)
    #[serde(default = "default_co")]
    pub co: UpperLimits,
    /// Air temperature (°C)
    #[serde(default = "default_temp")]
    pub temp: UpperLimits,
    #[serde(default)]
    pub humidity: HumidityLimits,
}

const fn default_nh3() -> UpperLimits {
    UpperLimits { warning: 25.0, danger: 50.0 }
}

const fn default_ch4() -> UpperLimits {
    UpperLimits { warning: 1_000.0, danger: 50_000.0 }
}

const fn default_co() -> UpperLimits {
    UpperLimits { warning: 35.0, danger: 200.0 }
}

const fn default_temp() -> UpperLimits {
    UpperLimits { warning: 30.0, danger: 35.0 }
}

impl Default for HazardThresholds {
    fn default() -> Self {
        Self {
            nh3: default_nh3(),
            ch4: default_ch4(),
            co: default_co(),
            temp: default_temp(),
            humidity: HumidityLimits::default(),
        }
    }
}

impl HazardThresholds {
    /// Ordering problems that would make the classifier's priority rules
    /// meaningless. Empty when the table is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, limits) in [
            ("nh3", self.nh3),
            ("ch4", self.ch4),
            ("co", self.co),
            ("temp", self.temp),
        ] {
            if !(limits.warning.is_finite() && limits.danger.is_finite()) {
                errors.push(format!("thresholds.{name}: limits must be finite"));
            } else if limits.danger <= limits.warning {
                errors.push(format!(
                    "thresholds.{name}: danger ({}) must be above warning ({})",
                    limits.danger, limits.warning
                ));
            }
        }
        let h = self.humidity;
        if !(h.danger_low < h.warning_low
            && h.warning_low < h.warning_high
            && h.warning_high < h.danger_high)
        {
            errors.push(format!(
                "thresholds.humidity: expected danger_low < warning_low < warning_high < danger_high, got {} / {} / {} / {}",
                h.danger_low, h.warning_low, h.warning_high, h.danger_high
            ));
        }
        errors
    }
}
