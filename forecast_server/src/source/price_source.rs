use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SourceError;

/// A daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// A provider of historical daily prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches the closing prices of `symbol` between `start` and `end`, both inclusive.
    ///
    /// # Returns
    /// The prices in chronological order, possibly empty if the range holds no trading days.
    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, SourceError>;
}
