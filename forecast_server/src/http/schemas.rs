use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    jobs::{JobId, JobStatus},
    request::ValidationError,
};

/// The default lookback of a symbol prediction without dates.
const DEFAULT_LOOKBACK_DAYS: u64 = 180;
/// The lookback of a symbol prediction with only an end date.
const END_ONLY_LOOKBACK_DAYS: u64 = 150;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainResponse {
    pub message: String,
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Either a symbol whose latest prices get fetched or the prices themselves. The symbol wins if
/// both are given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub last_60_days_prices: Option<Vec<f64>>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// What a prediction runs on.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictTarget {
    Symbol {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    Prices(Vec<f64>),
}

impl PredictRequest {
    /// Resolves what to predict on. Without dates a symbol looks back 180 days from `today`,
    /// with only an end date it looks back 150 days from it.
    pub fn target(self, today: NaiveDate) -> Result<PredictTarget, ValidationError> {
        let symbol = self.symbol.filter(|s| !s.trim().is_empty());

        let Some(symbol) = symbol else {
            return self
                .last_60_days_prices
                .map(PredictTarget::Prices)
                .ok_or(ValidationError::new(
                    "symbol",
                    "either symbol or last_60_days_prices is required",
                ));
        };

        let lookback = |end: NaiveDate, days| end.checked_sub_days(Days::new(days)).unwrap_or(end);

        let (start, end) = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => (start, end),
            (None, Some(end)) => (lookback(end, END_ONLY_LOOKBACK_DAYS), end),
            (Some(start), None) => (start, today),
            (None, None) => (lookback(today, DEFAULT_LOOKBACK_DAYS), today),
        };

        if start > end {
            return Err(ValidationError::new(
                "start_date",
                "must not be later than end_date",
            ));
        }

        Ok(PredictTarget::Symbol { symbol, start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}
