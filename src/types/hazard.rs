//! Hazard labels, status levels and the condensed summary document

use serde::{Deserialize, Serialize, Serializer};

use super::Levels;

/// How far a channel is past its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    None,
    Warning,
    Danger,
}

/// Fixed catalog of alert tags, keyed by (dimension, severity).
///
/// Serialized as the human-readable text sent to the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertLabel {
    Nh3Danger,
    Nh3Warning,
    Ch4Danger,
    Ch4Warning,
    CoDanger,
    CoWarning,
    TempDanger,
    TempWarning,
    HumidityDangerLow,
    HumidityWarningLow,
    HumidityDangerHigh,
    HumidityWarningHigh,
    /// A single step crossed no limit.
    AllClear,
    /// A whole forecast produced no alerts.
    NoHazardsDetected,
}

impl AlertLabel {
    pub const fn text(self) -> &'static str {
        match self {
            Self::Nh3Danger => "🚨 NH3 critical—Evacuate immediately!",
            Self::Nh3Warning => "⚠️ NH3 high—Ventilate & monitor!",
            Self::Ch4Danger => "🚨 CH4 explosive risk—Evacuate!",
            Self::Ch4Warning => "⚠️ CH4 elevated—Increase ventilation!",
            Self::CoDanger => "🚨 CO life-threatening—Seek fresh air now!",
            Self::CoWarning => "⚠️ CO rising—Check ventilation!",
            Self::TempDanger => "🔥 Extreme heat—Cool down & hydrate!",
            Self::TempWarning => "🌡️ Warm—Monitor for heat stress.",
            Self::HumidityDangerLow => "💧 Very dry—Risk of dehydration!",
            Self::HumidityWarningLow => "💧 Dry air—Increase humidity.",
            Self::HumidityDangerHigh => "💦 Very humid—Mold risk, dehumidify!",
            Self::HumidityWarningHigh => "💦 Humid—Ventilate to reduce moisture.",
            Self::AllClear => "✅ All levels safe.",
            Self::NoHazardsDetected => "✅ No hazards detected.",
        }
    }

    pub const fn severity(self) -> Severity {
        match self {
            Self::Nh3Danger
            | Self::Ch4Danger
            | Self::CoDanger
            | Self::TempDanger
            | Self::HumidityDangerLow
            | Self::HumidityDangerHigh => Severity::Danger,
            Self::Nh3Warning
            | Self::Ch4Warning
            | Self::CoWarning
            | Self::TempWarning
            | Self::HumidityWarningLow
            | Self::HumidityWarningHigh => Severity::Warning,
            Self::AllClear | Self::NoHazardsDetected => Severity::None,
        }
    }

    pub const fn is_alert(self) -> bool {
        !matches!(self, Self::AllClear | Self::NoHazardsDetected)
    }
}

impl std::fmt::Display for AlertLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

impl Serialize for AlertLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.text())
    }
}

/// Overall outlook for the forecast window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HazardStatus {
    Safe,
    Warning,
    Danger,
}

impl std::fmt::Display for HazardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Warning => write!(f, "Warning"),
            Self::Danger => write!(f, "Danger"),
        }
    }
}

/// Average predicted levels over one forecast hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyBucket {
    /// 1-based hour index.
    pub hour: usize,
    #[serde(rename = "avg_NH3")]
    pub avg_nh3: f64,
    #[serde(rename = "avg_CH4")]
    pub avg_ch4: f64,
    #[serde(rename = "avg_CO")]
    pub avg_co: f64,
    #[serde(rename = "avg_Temp")]
    pub avg_temp: f64,
    #[serde(rename = "avg_Humidity")]
    pub avg_humidity: f64,
}

impl HourlyBucket {
    pub const fn new(hour: usize, avg: Levels) -> Self {
        Self {
            hour,
            avg_nh3: avg.nh3,
            avg_ch4: avg.ch4,
            avg_co: avg.co,
            avg_temp: avg.temp,
            avg_humidity: avg.humidity,
        }
    }

    pub const fn levels(&self) -> Levels {
        Levels {
            nh3: self.avg_nh3,
            ch4: self.avg_ch4,
            co: self.avg_co,
            temp: self.avg_temp,
            humidity: self.avg_humidity,
        }
    }
}

/// Condensed per-cycle outlook: what is sent to the mesh and saved to disk.
///
/// Rebuilt every cycle, never read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardSummary {
    /// ISO-8601 local time the summary was built.
    pub timestamp: String,
    pub status: HazardStatus,
    /// Last input sample, rounded to 2 dp.
    pub current: Levels,
    /// Six hourly averages, rounded to 2 dp.
    pub forecast: Vec<HourlyBucket>,
    /// At most three deduplicated labels; never empty.
    pub alerts: Vec<AlertLabel>,
}

impl HazardSummary {
    /// Alert texts joined for a single message line.
    pub fn joined_alerts(&self, separator: &str) -> String {
        self.alerts
            .iter()
            .map(|a| a.text())
            .collect::<Vec<_>>()
            .join(separator)
    }
}
