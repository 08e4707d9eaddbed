use machine_learning::{arch::TrainedModel, scaler::MinMaxScaler};

/// A trained model and the scaler fitted in the same training run.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub model: TrainedModel,
    pub scaler: MinMaxScaler,
}

impl ArtifactSet {
    pub fn new(model: TrainedModel, scaler: MinMaxScaler) -> Self {
        Self { model, scaler }
    }

    /// Returns the length of the sequences the model takes.
    pub fn window(&self) -> usize {
        self.model.input_size()
    }
}
