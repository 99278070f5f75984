//! Hourly bucketing of the ten-minute forecast

use crate::types::{Forecast, Levels, STEPS_PER_BUCKET};

/// Average the forecast over contiguous, non-overlapping hourly buckets.
///
/// Bucket `h` covers steps `[6h, 6h + 6)`. A full forecast always yields
/// [`crate::types::BUCKET_COUNT`] buckets in chronological order.
pub fn aggregate(forecast: &Forecast) -> Vec<Levels> {
    forecast
        .steps()
        .chunks_exact(STEPS_PER_BUCKET)
        .map(|bucket| {
            let mut sum = [0.0f64; 5];
            for step in bucket {
                for (acc, v) in sum.iter_mut().zip(step.levels().to_row()) {
                    *acc += v;
                }
            }
            #[allow(clippy::cast_precision_loss)]
            let n = bucket.len() as f64;
            Levels::from_row(sum.map(|s| s / n))
        })
        .collect()
}
