use std::{error::Error, fmt};

use machine_learning::MlErr;

use crate::source::SourceError;

/// Why a prediction could not be made.
#[derive(Debug)]
pub enum InferenceError {
    /// No artifacts are loaded yet.
    ModelUnavailable,
    InvalidInput(String),
    InsufficientData {
        symbol: String,
        got: usize,
        required: usize,
    },
    Source(SourceError),
    Model(MlErr),
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::ModelUnavailable => {
                write!(f, "no model is loaded yet, train one first")
            }
            InferenceError::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            InferenceError::InsufficientData {
                symbol,
                got,
                required,
            } => write!(
                f,
                "insufficient data for {symbol}: found {got} prices, need {required}"
            ),
            InferenceError::Source(e) => write!(f, "{e}"),
            InferenceError::Model(e) => write!(f, "prediction failed: {e}"),
        }
    }
}

impl Error for InferenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InferenceError::Source(e) => Some(e),
            InferenceError::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SourceError> for InferenceError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

impl From<MlErr> for InferenceError {
    fn from(value: MlErr) -> Self {
        match value {
            MlErr::NonFiniteInput { .. } => Self::InvalidInput(value.to_string()),
            other => Self::Model(other),
        }
    }
}
