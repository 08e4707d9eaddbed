mod error;
mod service;

pub use error::InferenceError;
pub use service::InferenceService;
