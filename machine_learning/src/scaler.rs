use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// Scales values linearly into `[0, 1]` using the minimum and maximum seen while fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fits a new `MinMaxScaler` over `values`.
    ///
    /// # Returns
    /// An error if `values` is empty or holds NaN or infinite values.
    pub fn fit(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(MlErr::NonFiniteInput {
                what: "scaler fit values",
            });
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            });

        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    // A constant fit range maps everything to 0 instead of dividing by zero.
    fn scale(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0. { 1. } else { range }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.scale()
    }

    pub fn inverse_transform(&self, value: f64) -> f64 {
        value * self.scale() + self.min
    }

    /// Transforms every value of `values`.
    ///
    /// # Returns
    /// An error if any value is NaN or infinite.
    pub fn transform_all(&self, values: &[f64]) -> Result<Vec<f64>> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(MlErr::NonFiniteInput {
                what: "scaler input",
            });
        }

        Ok(values.iter().map(|&v| self.transform(v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_maps_range_onto_unit_interval() {
        let scaler = MinMaxScaler::fit(&[10., 20., 15.]).unwrap();

        assert_eq!(scaler.transform(10.), 0.);
        assert_eq!(scaler.transform(20.), 1.);
        assert_eq!(scaler.transform(15.), 0.5);
        assert_eq!(scaler.inverse_transform(0.5), 15.);
    }

    #[test]
    fn test_values_outside_the_fit_range_extrapolate() {
        let scaler = MinMaxScaler::fit(&[0., 100.]).unwrap();
        assert_eq!(scaler.transform(150.), 1.5);
        assert_eq!(scaler.inverse_transform(-0.5), -50.);
    }

    #[test]
    fn test_constant_series() {
        let scaler = MinMaxScaler::fit(&[3., 3., 3.]).unwrap();
        assert_eq!(scaler.transform(3.), 0.);
        assert_eq!(scaler.inverse_transform(0.), 3.);
    }

    #[test]
    fn test_rejects_empty_and_non_finite() {
        assert_eq!(MinMaxScaler::fit(&[]), Err(MlErr::EmptyDataset));
        assert!(MinMaxScaler::fit(&[1., f64::NAN]).is_err());

        let scaler = MinMaxScaler::fit(&[1., 2.]).unwrap();
        assert!(scaler.transform_all(&[1., f64::INFINITY]).is_err());
    }
}
