mod error;
mod repository;
mod set;
mod store;

pub use error::ArtifactError;
pub use repository::{ArtifactPaths, ArtifactRepository, BestModelInfo, PersistOutcome};
pub use set::ArtifactSet;
pub use store::ArtifactStore;
