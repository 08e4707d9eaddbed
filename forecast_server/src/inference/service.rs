use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;

use super::InferenceError;
use crate::{
    artifacts::{ArtifactSet, ArtifactStore},
    source::PriceSource,
};

/// Serves predictions from whatever artifacts the store holds when each call starts.
#[derive(Clone)]
pub struct InferenceService {
    store: Arc<ArtifactStore>,
    source: Arc<dyn PriceSource>,
    window: usize,
}

impl InferenceService {
    /// Creates a new `InferenceService`.
    ///
    /// # Arguments
    /// * `store` - The serving artifacts.
    /// * `source` - Where the latest prices of a symbol come from.
    /// * `window` - The amount of prices every prediction takes.
    pub fn new(store: Arc<ArtifactStore>, source: Arc<dyn PriceSource>, window: usize) -> Self {
        Self {
            store,
            source,
            window,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_loaded()
    }

    /// Predicts the price following `sequence`, the last `window` prices in chronological order.
    pub fn predict(&self, sequence: &[f64]) -> Result<f64, InferenceError> {
        if sequence.len() != self.window {
            return Err(InferenceError::InvalidInput(format!(
                "expected {} prices, got {}",
                self.window,
                sequence.len()
            )));
        }

        let set = self.snapshot()?;
        predict_with(&set, sequence)
    }

    /// Fetches the prices of `symbol` between `start` and `end` and predicts the price following
    /// the last `window` of them.
    pub async fn predict_latest(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<f64, InferenceError> {
        // the artifacts are pinned before the fetch, a reload meanwhile doesn't affect this call
        let set = self.snapshot()?;

        let points = self.source.history(symbol, start, end).await?;
        debug!("fetched {} prices of {symbol}", points.len());

        if points.len() < self.window {
            return Err(InferenceError::InsufficientData {
                symbol: symbol.to_string(),
                got: points.len(),
                required: self.window,
            });
        }

        let closes: Vec<f64> = points[points.len() - self.window..]
            .iter()
            .map(|p| p.close)
            .collect();

        predict_with(&set, &closes)
    }

    fn snapshot(&self) -> Result<Arc<ArtifactSet>, InferenceError> {
        self.store.snapshot().ok_or(InferenceError::ModelUnavailable)
    }
}

fn predict_with(set: &ArtifactSet, sequence: &[f64]) -> Result<f64, InferenceError> {
    let normalized: Vec<f32> = set
        .scaler
        .transform_all(sequence)?
        .into_iter()
        .map(|v| v as f32)
        .collect();

    let prediction = set.model.predict_one(&normalized)?;
    Ok(set.scaler.inverse_transform(f64::from(prediction)))
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use machine_learning::{
        arch::{Model, ModelSpec, TrainedModel},
        scaler::MinMaxScaler,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::source::{InMemorySource, PricePoint, SourceError};

    const WINDOW: usize = 5;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    // A model that always outputs 0 predicts the scaler's minimum.
    fn zero_model(min: f64, max: f64) -> ArtifactSet {
        let spec = ModelSpec::sequence_regressor(WINDOW, 3, 1, 0.2).unwrap();
        let size = spec.build(0).size();
        let model = TrainedModel::new(spec, vec![0.; size]).unwrap();
        ArtifactSet::new(model, MinMaxScaler::fit(&[min, max]).unwrap())
    }

    fn service(store: ArtifactStore) -> InferenceService {
        let source = InMemorySource::new();
        source.insert_closes("TEST", date(1), &[1., 2., 3., 4., 5., 6., 7.]);
        InferenceService::new(Arc::new(store), Arc::new(source), WINDOW)
    }

    #[test]
    fn test_wrong_length_is_rejected_first() {
        for store in [ArtifactStore::new(), ArtifactStore::with(zero_model(0., 1.))] {
            let err = service(store).predict(&[1., 2., 3.]).unwrap_err();
            assert!(matches!(err, InferenceError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_no_model() {
        let err = service(ArtifactStore::new())
            .predict(&[1.; WINDOW])
            .unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable));
    }

    #[test]
    fn test_prediction_is_inverse_transformed() {
        let service = service(ArtifactStore::with(zero_model(10., 20.)));
        assert!(service.is_ready());
        assert_eq!(service.predict(&[12., 13., 14., 15., 16.]).unwrap(), 10.);
    }

    #[test]
    fn test_non_finite_prices() {
        let service = service(ArtifactStore::with(zero_model(10., 20.)));
        let err = service.predict(&[1., 2., f64::NAN, 4., 5.]).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInput(_)));
    }

    #[test]
    fn test_replacement_is_seen_by_the_next_call() {
        let store = Arc::new(ArtifactStore::with(zero_model(10., 20.)));
        let source = Arc::new(InMemorySource::new());
        let service = InferenceService::new(Arc::clone(&store), source, WINDOW);

        assert_eq!(service.predict(&[1.; WINDOW]).unwrap(), 10.);
        store.swap(zero_model(30., 40.));
        assert_eq!(service.predict(&[1.; WINDOW]).unwrap(), 30.);
    }

    #[tokio::test]
    async fn test_predict_latest() {
        let service = service(ArtifactStore::with(zero_model(10., 20.)));
        let end = date(1).checked_add_days(Days::new(30)).unwrap();

        assert_eq!(service.predict_latest("TEST", date(1), end).await.unwrap(), 10.);

        let err = service
            .predict_latest("TEST", date(1), date(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InferenceError::InsufficientData {
                got: 3,
                required: WINDOW,
                ..
            }
        ));
    }

    /// Serves new artifacts while a fetch is in flight.
    struct ReloadingSource {
        store: Arc<ArtifactStore>,
        inner: InMemorySource,
    }

    #[async_trait]
    impl PriceSource for ReloadingSource {
        async fn history(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<PricePoint>, SourceError> {
            self.store.swap(zero_model(30., 40.));
            self.inner.history(symbol, start, end).await
        }
    }

    #[tokio::test]
    async fn test_predict_latest_keeps_the_artifacts_it_started_with() {
        let store = Arc::new(ArtifactStore::with(zero_model(10., 20.)));
        let inner = InMemorySource::new();
        inner.insert_closes("TEST", date(1), &[1., 2., 3., 4., 5., 6., 7.]);
        let source = Arc::new(ReloadingSource {
            store: Arc::clone(&store),
            inner,
        });
        let service = InferenceService::new(store, source, WINDOW);

        assert_eq!(service.predict_latest("TEST", date(1), date(7)).await.unwrap(), 10.);
        assert_eq!(service.predict(&[1.; WINDOW]).unwrap(), 30.);
    }

    #[tokio::test]
    async fn test_predict_latest_without_model() {
        let err = service(ArtifactStore::new())
            .predict_latest("TEST", date(1), date(20))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable));
    }
}
