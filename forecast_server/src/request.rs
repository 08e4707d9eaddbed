use std::{error::Error, fmt};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Seeds every random number generator of a run whose request doesn't pick a seed.
pub const DEFAULT_SEED: u64 = 42;

/// A malformed request, rejected before reaching the jobs or the models.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid `{}`: {}", self.field, self.reason)
    }
}

impl Error for ValidationError {}

/// Everything a training run needs. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingRequest {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub num_layers: usize,
    pub dropout: f32,
    pub hidden_layer_size: usize,
    pub seed: Option<u64>,
}

impl Default for TrainingRequest {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            start_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 7, 20).unwrap_or_default(),
            epochs: 50,
            batch_size: 64,
            learning_rate: 0.001,
            num_layers: 2,
            dropout: 0.2,
            hidden_layer_size: 64,
            seed: None,
        }
    }
}

impl TrainingRequest {
    /// Returns the seed of this run.
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    /// Checks every field holds a usable value.
    ///
    /// # Returns
    /// The first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::new("symbol", "must not be empty"));
        }

        if self.start_date >= self.end_date {
            return Err(ValidationError::new(
                "start_date",
                "must be earlier than end_date",
            ));
        }

        let positive = [
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("num_layers", self.num_layers),
            ("hidden_layer_size", self.hidden_layer_size),
        ];

        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ValidationError::new(field, "must be positive"));
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.) {
            return Err(ValidationError::new("learning_rate", "must be positive"));
        }

        if !(0. ..=1.).contains(&self.dropout) {
            return Err(ValidationError::new("dropout", "must be within [0, 1]"));
        }

        Ok(())
    }
}
