use std::{error::Error, fmt};

use super::{JobId, JobStatus};

/// Job registry misuse.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    Duplicate(JobId),
    Unknown(JobId),
    NotFound(String),
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Duplicate(job_id) => write!(f, "job {job_id} already exists"),
            RegistryError::Unknown(job_id) => write!(f, "job {job_id} is not registered"),
            RegistryError::NotFound(job_id) => write!(f, "job {job_id} not found"),
            RegistryError::InvalidTransition { job_id, from, to } => {
                write!(f, "job {job_id} can't go from {from} to {to}")
            }
        }
    }
}

impl Error for RegistryError {}
