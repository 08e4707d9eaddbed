mod error;
mod executor;
mod outcome;

pub use error::TrainingError;
pub use executor::TrainingExecutor;
pub use outcome::{TrainingMetrics, TrainingOutcome};
