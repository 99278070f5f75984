//! Sensor readings: the five-channel input window sent by the device

use serde::{Deserialize, Serialize};

use super::{Dimension, Levels, INPUT_STEPS};

/// Reasons a reading is not a valid oracle input window.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadingError {
    #[error("{dimension} has {actual} values, expected exactly {expected}")]
    WrongLength {
        dimension: Dimension,
        actual: usize,
        expected: usize,
    },
    #[error("{dimension} contains a non-finite value at index {index}")]
    NonFinite { dimension: Dimension, index: usize },
}

/// One device frame: five parallel series sampled every ten minutes.
///
/// Missing keys deserialize to empty series. Length is only enforced by
/// [`Reading::validate`], which the summary service and the oracle apply;
/// the ingestion pipeline forwards whatever the device sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default)]
    pub nh3: Vec<f64>,
    #[serde(default)]
    pub ch4: Vec<f64>,
    #[serde(default)]
    pub co: Vec<f64>,
    #[serde(default)]
    pub temp: Vec<f64>,
    #[serde(default)]
    pub humidity: Vec<f64>,
}

impl Reading {
    /// Build a reading where every sample of a channel holds the same value.
    pub fn constant(levels: Levels, steps: usize) -> Self {
        Self {
            nh3: vec![levels.nh3; steps],
            ch4: vec![levels.ch4; steps],
            co: vec![levels.co; steps],
            temp: vec![levels.temp; steps],
            humidity: vec![levels.humidity; steps],
        }
    }

    pub fn series(&self, dimension: Dimension) -> &[f64] {
        match dimension {
            Dimension::Nh3 => &self.nh3,
            Dimension::Ch4 => &self.ch4,
            Dimension::Co => &self.co,
            Dimension::Temp => &self.temp,
            Dimension::Humidity => &self.humidity,
        }
    }

    /// Check the oracle input contract: every channel has exactly
    /// [`INPUT_STEPS`] finite samples.
    pub fn validate(&self) -> Result<(), ReadingError> {
        for dimension in Dimension::ALL {
            let series = self.series(dimension);
            if series.len() != INPUT_STEPS {
                return Err(ReadingError::WrongLength {
                    dimension,
                    actual: series.len(),
                    expected: INPUT_STEPS,
                });
            }
            if let Some(index) = series.iter().position(|v| !v.is_finite()) {
                return Err(ReadingError::NonFinite { dimension, index });
            }
        }
        Ok(())
    }

    /// The most recent sample of every channel.
    ///
    /// Channels with no samples report `0.0`.
    pub fn latest(&self) -> Levels {
        let last = |d: Dimension| self.series(d).last().copied().unwrap_or(0.0);
        Levels {
            nh3: last(Dimension::Nh3),
            ch4: last(Dimension::Ch4),
            co: last(Dimension::Co),
            temp: last(Dimension::Temp),
            humidity: last(Dimension::Humidity),
        }
    }

    /// Number of samples in the longest channel.
    pub fn steps(&self) -> usize {
        Dimension::ALL
            .iter()
            .map(|d| self.series(*d).len())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ambient() -> Levels {
        Levels {
            nh3: 10.0,
            ch4: 500.0,
            co: 10.0,
            temp: 22.0,
            humidity: 50.0,
        }
    }

    #[test]
    fn test_missing_keys_default_to_empty() {
        let reading: Reading = serde_json::from_str(r#"{"nh3":[1,2,3]}"#).unwrap();
        assert_eq!(reading.nh3, vec![1.0, 2.0, 3.0]);
        assert!(reading.ch4.is_empty());
        assert!(reading.humidity.is_empty());
        assert_eq!(reading.steps(), 3);
    }

    #[test]
    fn test_validate_accepts_full_window() {
        let reading = Reading::constant(ambient(), INPUT_STEPS);
        assert!(reading.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_channel() {
        let mut reading = Reading::constant(ambient(), INPUT_STEPS);
        reading.co.pop();
        assert_eq!(
            reading.validate(),
            Err(ReadingError::WrongLength {
                dimension: Dimension::Co,
                actual: 17,
                expected: INPUT_STEPS,
            })
        );
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut reading = Reading::constant(ambient(), INPUT_STEPS);
        reading.temp[4] = f64::NAN;
        assert_eq!(
            reading.validate(),
            Err(ReadingError::NonFinite {
                dimension: Dimension::Temp,
                index: 4
            })
        );
    }

    #[test]
    fn test_latest_uses_last_sample_and_zero_for_empty() {
        let reading = Reading {
            nh3: vec![1.0, 2.0],
            humidity: vec![40.0, 41.5],
            ..Default::default()
        };
        let latest = reading.latest();
        assert_eq!(latest.nh3, 2.0);
        assert_eq!(latest.humidity, 41.5);
        assert_eq!(latest.ch4, 0.0);
    }
}
