mod error;
mod orchestrator;
mod record;
mod registry;

pub use error::RegistryError;
pub use orchestrator::JobOrchestrator;
pub use record::{JobId, JobRecord, JobStatus, JobTransition};
pub use registry::JobRegistry;
