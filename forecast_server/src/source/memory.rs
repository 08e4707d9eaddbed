use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use parking_lot::RwLock;

use super::{PricePoint, PriceSource, SourceError};

/// A price source over series held in memory.
///
/// Unknown symbols either fail or get a synthetic series, depending on how it was built.
#[derive(Debug, Default)]
pub struct InMemorySource {
    series: RwLock<HashMap<String, Vec<PricePoint>>>,
    synthesize: bool,
}

impl InMemorySource {
    /// Creates an empty `InMemorySource` that fails for unknown symbols.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an `InMemorySource` that answers unknown symbols with a synthetic daily series,
    /// so the service can run without network access.
    pub fn synthetic() -> Self {
        Self {
            synthesize: true,
            ..Self::default()
        }
    }

    /// Sets the series of `symbol`, sorted chronologically.
    pub fn insert(&self, symbol: &str, mut points: Vec<PricePoint>) {
        points.sort_by_key(|p| p.date);
        self.series.write().insert(symbol.to_string(), points);
    }

    /// Sets the series of `symbol` to `closes`, one per day starting at `start`.
    pub fn insert_closes(&self, symbol: &str, start: NaiveDate, closes: &[f64]) {
        let points = closes
            .iter()
            .enumerate()
            .filter_map(|(i, &close)| {
                let date = start.checked_add_days(Days::new(i as u64))?;
                Some(PricePoint { date, close })
            })
            .collect();

        self.insert(symbol, points);
    }
}

/// A deterministic, strictly positive price series of `len` points: a slow trend with a weekly
/// and a monthly oscillation on top.
pub fn synthetic_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            100. + 0.05 * t + 3. * (t / 7.).sin() + 1.5 * (t / 29.).cos()
        })
        .collect()
}

#[async_trait]
impl PriceSource for InMemorySource {
    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, SourceError> {
        if let Some(points) = self.series.read().get(symbol) {
            return Ok(points
                .iter()
                .filter(|p| (start..=end).contains(&p.date))
                .copied()
                .collect());
        }

        if !self.synthesize {
            return Err(SourceError::UnknownSymbol(symbol.to_string()));
        }

        let days = (end - start).num_days().max(-1) + 1;
        let points = synthetic_closes(days as usize)
            .into_iter()
            .zip(start.iter_days())
            .map(|(close, date)| PricePoint { date, close })
            .collect();

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_range_filter() {
        let source = InMemorySource::new();
        source.insert_closes("TEST", date(2024, 1, 1), &[1., 2., 3., 4., 5.]);

        let points = source
            .history("TEST", date(2024, 1, 2), date(2024, 1, 4))
            .await
            .unwrap();

        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![2., 3., 4.]);
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let source = InMemorySource::new();
        let err = source
            .history("NOPE", date(2024, 1, 1), date(2024, 2, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::UnknownSymbol(_)));
    }

    #[tokio::test]
    async fn test_synthetic_series() {
        let source = InMemorySource::synthetic();
        let points = source
            .history("ANY", date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap();

        assert_eq!(points.len(), 31);
        assert_eq!(points[0].date, date(2024, 1, 1));
        assert_eq!(points[30].date, date(2024, 1, 31));
        assert!(points.iter().all(|p| p.close > 0.));

        let reversed = source
            .history("ANY", date(2024, 1, 31), date(2024, 1, 1))
            .await
            .unwrap();
        assert!(reversed.is_empty());
    }
}
