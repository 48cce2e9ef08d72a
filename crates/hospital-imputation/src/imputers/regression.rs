//! Ordinary least squares with a single predictor.

use crate::error::{ImputationError, Result};
use serde::{Deserialize, Serialize};

/// A fitted line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearRegression {
    /// Fit on paired samples `(x, y)`.
    ///
    /// A single point does not determine a line, so fewer than two samples
    /// yields [`ImputationError::NoTrainableData`]. When every `x` is equal the
    /// minimum-norm solution is returned: a flat line through the mean of `y`.
    pub fn fit(samples: &[(f64, f64)]) -> Result<Self> {
        if samples.len() < 2 {
            return Err(ImputationError::NoTrainableData {
                samples: samples.len(),
            });
        }

        let n = samples.len() as f64;
        let x_mean = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
        let y_mean = samples.iter().map(|(_, y)| y).sum::<f64>() / n;

        let (sxy, sxx) = samples.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });

        let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
        Ok(Self {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}
