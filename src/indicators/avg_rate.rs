// =============================================================================
// Average Rate — short-window average relative to a long-window baseline
// =============================================================================
//
// For every index i with a full lookback window behind it:
//   base   = mean(close[i-N .. i])
//   recent = mean(close[i-15 .. i])
//   rate   = (recent - base) / base
//
// The recent window is fixed at RECENT_WINDOW regardless of N, so N must be
// at least RECENT_WINDOW for both windows to exist.

use crate::error::ComputeError;
use crate::types::{RawObservation, TransformedPoint};

/// Number of observations in the short "recent" average.
pub const RECENT_WINDOW: usize = 15;

/// Compute the normalized rate-of-change series for `observations`.
///
/// Returns `observations.len() - lookback` points (none when the series is
/// not longer than the window), each dated on the observation it describes.
pub fn calculate_avg_rate(
    observations: &[RawObservation],
    lookback: usize,
) -> Result<Vec<TransformedPoint>, ComputeError> {
    if lookback < RECENT_WINDOW {
        return Err(ComputeError::WindowTooShort {
            window: lookback,
            min: RECENT_WINDOW,
        });
    }
    if observations.len() <= lookback {
        return Ok(Vec::new());
    }

    let closes: Vec<f64> = observations.iter().map(|o| o.close).collect();
    let mut result = Vec::with_capacity(observations.len() - lookback);
    for i in lookback..observations.len() {
        let base = mean(&closes[i - lookback..i]);
        if base == 0.0 {
            return Err(ComputeError::ZeroBaseline {
                date: observations[i].date,
            });
        }
        let recent = mean(&closes[i - RECENT_WINDOW..i]);
        result.push(TransformedPoint {
            date: observations[i].date,
            rate: (recent - base) / base,
        });
    }
    Ok(result)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
