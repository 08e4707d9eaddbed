use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// Error metrics of a regression over its original scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
}

impl RegressionMetrics {
    /// Computes the metrics of `predictions` against `actuals`.
    ///
    /// Points whose actual value is zero are left out of the MAPE, which is 0 when no point
    /// qualifies.
    ///
    /// # Returns
    /// An error if the slices differ in length or are empty.
    pub fn compute(predictions: &[f64], actuals: &[f64]) -> Result<Self> {
        if predictions.len() != actuals.len() {
            return Err(MlErr::SizeMismatch {
                what: "predictions",
                got: predictions.len(),
                expected: actuals.len(),
            });
        }

        if actuals.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let n = actuals.len() as f64;
        let pairs = || predictions.iter().zip(actuals);

        let mae = pairs().map(|(p, a)| (p - a).abs()).sum::<f64>() / n;
        let rmse = (pairs().map(|(p, a)| (p - a).powi(2)).sum::<f64>() / n).sqrt();

        let (sum, count) = pairs()
            .filter(|(_, a)| **a != 0.)
            .fold((0., 0usize), |(sum, count), (p, a)| {
                (sum + ((p - a) / a).abs(), count + 1)
            });

        let mape = if count == 0 {
            0.
        } else {
            sum / count as f64 * 100.
        };

        Ok(Self { mae, rmse, mape })
    }
}
