//! Shared data structures for the air-quality forecasting pipeline
//!
//! - [`Reading`]: 18-step input window from the sensor node
//! - [`Forecast`]: 36 clamped [`ForecastStep`]s from the oracle
//! - [`HazardSummary`]: condensed status, hourly buckets and key alerts

mod forecast;
mod hazard;
mod reading;

pub use forecast::{Forecast, ForecastStep, ShapeError};
pub use hazard::{AlertLabel, HazardStatus, HazardSummary, HourlyBucket, Severity};
pub use reading::{Reading, ReadingError};

use serde::{Deserialize, Serialize};

/// Samples per channel in one input window (3 h at 10 min).
pub const INPUT_STEPS: usize = 18;

/// Steps in one forecast (6 h at 10 min).
pub const FORECAST_STEPS: usize = 36;

/// Forecast steps averaged into one hourly bucket.
pub const STEPS_PER_BUCKET: usize = 6;

/// Hourly buckets per forecast.
pub const BUCKET_COUNT: usize = FORECAST_STEPS / STEPS_PER_BUCKET;

/// The five monitored hazard channels, in wire/column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Nh3,
    Ch4,
    Co,
    Temp,
    Humidity,
}

impl Dimension {
    pub const ALL: [Self; 5] = [Self::Nh3, Self::Ch4, Self::Co, Self::Temp, Self::Humidity];

    /// Lower-case key used in device frames, oracle requests and CSV headers.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Nh3 => "nh3",
            Self::Ch4 => "ch4",
            Self::Co => "co",
            Self::Temp => "temp",
            Self::Humidity => "humidity",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nh3 => write!(f, "NH3"),
            Self::Ch4 => write!(f, "CH4"),
            Self::Co => write!(f, "CO"),
            Self::Temp => write!(f, "Temp"),
            Self::Humidity => write!(f, "Humidity"),
        }
    }
}

/// One value per hazard channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    #[serde(rename = "NH3")]
    pub nh3: f64,
    #[serde(rename = "CH4")]
    pub ch4: f64,
    #[serde(rename = "CO")]
    pub co: f64,
    #[serde(rename = "Temp")]
    pub temp: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
}

impl Levels {
    /// Build from a row in [`Dimension::ALL`] order.
    pub const fn from_row(row: [f64; 5]) -> Self {
        Self {
            nh3: row[0],
            ch4: row[1],
            co: row[2],
            temp: row[3],
            humidity: row[4],
        }
    }

    pub const fn to_row(self) -> [f64; 5] {
        [self.nh3, self.ch4, self.co, self.temp, self.humidity]
    }

    pub const fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Nh3 => self.nh3,
            Dimension::Ch4 => self.ch4,
            Dimension::Co => self.co,
            Dimension::Temp => self.temp,
            Dimension::Humidity => self.humidity,
        }
    }

    /// Round every channel to `places` decimal places for display.
    #[must_use]
    pub fn rounded(self, places: i32) -> Self {
        let r = |v: f64| round_to(v, places);
        Self {
            nh3: r(self.nh3),
            ch4: r(self.ch4),
            co: r(self.co),
            temp: r(self.temp),
            humidity: r(self.humidity),
        }
    }
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
