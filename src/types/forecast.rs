//! Oracle output: a fixed 36×5 grid of non-negative predictions

use serde::Serialize;

use super::{Dimension, Levels, FORECAST_STEPS};

/// The oracle returned something that is not a 36×5 grid of finite numbers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("expected {expected} forecast steps, got {actual}")]
    StepCount { expected: usize, actual: usize },
    #[error("forecast step {step} has {actual} values, expected 5")]
    RowWidth { step: usize, actual: usize },
    #[error("forecast step {step} has a non-finite {dimension} value")]
    NonFinite { step: usize, dimension: Dimension },
}

/// Predicted levels for one future ten-minute step.
///
/// Negative predictions are clamped to zero on construction; concentrations
/// and humidity cannot go below zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForecastStep(Levels);

impl ForecastStep {
    pub fn new(levels: Levels) -> Self {
        let row = levels.to_row().map(|v| v.max(0.0));
        Self(Levels::from_row(row))
    }

    pub fn from_row(row: [f64; 5]) -> Self {
        Self::new(Levels::from_row(row))
    }

    pub const fn levels(&self) -> &Levels {
        &self.0
    }

    pub const fn get(&self, dimension: Dimension) -> f64 {
        self.0.get(dimension)
    }
}

/// Exactly [`FORECAST_STEPS`] predicted steps in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Forecast {
    steps: Vec<ForecastStep>,
}

impl Forecast {
    /// Decode a row-major grid, failing on any shape or value mismatch.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ShapeError> {
        if rows.len() != FORECAST_STEPS {
            return Err(ShapeError::StepCount {
                expected: FORECAST_STEPS,
                actual: rows.len(),
            });
        }
        let mut steps = Vec::with_capacity(FORECAST_STEPS);
        for (step, row) in rows.iter().enumerate() {
            let row: [f64; 5] = row
                .as_slice()
                .try_into()
                .map_err(|_| ShapeError::RowWidth {
                    step,
                    actual: row.len(),
                })?;
            steps.push(Self::checked_step(step, Levels::from_row(row))?);
        }
        Ok(Self { steps })
    }

    /// Build from per-step levels, enforcing the same contract as
    /// [`Forecast::from_rows`].
    pub fn from_levels(levels: &[Levels]) -> Result<Self, ShapeError> {
        if levels.len() != FORECAST_STEPS {
            return Err(ShapeError::StepCount {
                expected: FORECAST_STEPS,
                actual: levels.len(),
            });
        }
        let steps = levels
            .iter()
            .enumerate()
            .map(|(step, l)| Self::checked_step(step, *l))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    /// A forecast that predicts the same levels for every step.
    pub fn constant(levels: Levels) -> Self {
        Self {
            steps: vec![ForecastStep::new(levels); FORECAST_STEPS],
        }
    }

    fn checked_step(step: usize, levels: Levels) -> Result<ForecastStep, ShapeError> {
        if let Some(dimension) = Dimension::ALL
            .into_iter()
            .find(|d| !levels.get(*d).is_finite())
        {
            return Err(ShapeError::NonFinite { step, dimension });
        }
        Ok(ForecastStep::new(levels))
    }

    pub fn steps(&self) -> &[ForecastStep] {
        &self.steps
    }
}
