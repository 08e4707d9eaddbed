use std::sync::Arc;

use machine_learning::{arch::TrainedModel, scaler::MinMaxScaler};
use parking_lot::RwLock;

use super::ArtifactSet;

/// Holds the artifacts currently serving predictions.
///
/// The pair lives behind a single `Arc` that gets swapped as a whole: readers clone the `Arc` and
/// release the lock right away, so inference never holds it and never sees a model from one run
/// next to a scaler from another.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    current: RwLock<Option<Arc<ArtifactSet>>>,
}

impl ArtifactStore {
    /// Creates an empty `ArtifactStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an `ArtifactStore` already serving `set`.
    pub fn with(set: ArtifactSet) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(set))),
        }
    }

    /// Returns the serving artifacts, if any.
    pub fn snapshot(&self) -> Option<Arc<ArtifactSet>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Starts serving `model` and `scaler`.
    ///
    /// # Returns
    /// The previously serving artifacts.
    pub fn replace(&self, model: TrainedModel, scaler: MinMaxScaler) -> Option<Arc<ArtifactSet>> {
        self.swap(ArtifactSet::new(model, scaler))
    }

    /// Starts serving `set`.
    pub fn swap(&self, set: ArtifactSet) -> Option<Arc<ArtifactSet>> {
        let next = Arc::new(set);
        self.current.write().replace(next)
    }
}
