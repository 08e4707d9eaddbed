use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    NonFiniteLoss {
        epoch: usize,
        loss: f32,
    },
    NonFiniteInput {
        what: &'static str,
    },
    EmptyDataset,
    InvalidHyperparameter {
        name: &'static str,
        reason: &'static str,
    },
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => format!("size mismatch for {what}: got {got}, expected {expected}"),
            MlErr::NonFiniteLoss { epoch, loss } => {
                format!("training diverged at epoch {epoch}: loss is {loss}")
            }
            MlErr::NonFiniteInput { what } => format!("{what} contains NaN or infinite values"),
            MlErr::EmptyDataset => "the dataset has no rows".to_string(),
            MlErr::InvalidHyperparameter { name, reason } => {
                format!("invalid hyperparameter `{name}`: {reason}")
            }
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {}
