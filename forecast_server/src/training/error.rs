use std::{error::Error, fmt};

use machine_learning::MlErr;

use crate::{artifacts::ArtifactError, source::SourceError};

/// Why a training run failed.
#[derive(Debug)]
pub enum TrainingError {
    InsufficientData {
        symbol: String,
        got: usize,
        required: usize,
    },
    /// The loss or the predictions stopped being finite.
    Numerical(String),
    Source(SourceError),
    Model(MlErr),
    Artifact(ArtifactError),
    /// The blocking fit panicked or was cancelled by the runtime.
    Aborted(String),
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingError::InsufficientData {
                symbol,
                got,
                required,
            } => write!(
                f,
                "insufficient data for {symbol}: got {got} observations, need at least {required}"
            ),
            TrainingError::Numerical(reason) => write!(f, "numerical error: {reason}"),
            TrainingError::Source(e) => write!(f, "{e}"),
            TrainingError::Model(e) => write!(f, "model error: {e}"),
            TrainingError::Artifact(e) => write!(f, "could not persist artifacts: {e}"),
            TrainingError::Aborted(reason) => write!(f, "training aborted: {reason}"),
        }
    }
}

impl Error for TrainingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainingError::Source(e) => Some(e),
            TrainingError::Model(e) => Some(e),
            TrainingError::Artifact(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for TrainingError {
    fn from(value: MlErr) -> Self {
        match value {
            MlErr::NonFiniteLoss { .. } | MlErr::NonFiniteInput { .. } => {
                Self::Numerical(value.to_string())
            }
            other => Self::Model(other),
        }
    }
}

impl From<SourceError> for TrainingError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

impl From<ArtifactError> for TrainingError {
    fn from(value: ArtifactError) -> Self {
        Self::Artifact(value)
    }
}
