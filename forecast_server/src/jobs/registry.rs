use std::collections::{HashMap, hash_map::Entry};

use chrono::Utc;
use parking_lot::Mutex;

use super::{JobId, JobRecord, JobTransition, RegistryError};

/// The in-memory record of every job submitted since the process started. Records are never
/// evicted.
///
/// Every operation holds the lock only for the map access itself.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending job.
    pub fn create(&self, job_id: JobId) -> Result<JobRecord, RegistryError> {
        match self.jobs.lock().entry(job_id) {
            Entry::Occupied(entry) => Err(RegistryError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                let record = JobRecord::pending(entry.key().clone());
                Ok(entry.insert(record).clone())
            }
        }
    }

    /// Moves a job along its lifecycle: pending, running, then completed or failed.
    ///
    /// # Returns
    /// The updated record, or an error if the job is unknown or not in the status the transition
    /// starts from.
    pub fn transition(
        &self,
        job_id: &JobId,
        transition: JobTransition,
    ) -> Result<JobRecord, RegistryError> {
        let mut jobs = self.jobs.lock();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| RegistryError::Unknown(job_id.clone()))?;

        if record.status != transition.source() {
            return Err(RegistryError::InvalidTransition {
                job_id: job_id.clone(),
                from: record.status,
                to: transition.target(),
            });
        }

        record.status = transition.target();
        record.updated_at = Utc::now();

        match transition {
            JobTransition::Start => {}
            JobTransition::Complete(metrics) => record.result = Some(metrics),
            JobTransition::Fail(error) => record.error = Some(error),
        }

        Ok(record.clone())
    }

    /// Returns a copy of a job's record.
    pub fn get(&self, job_id: &str) -> Result<JobRecord, RegistryError> {
        self.jobs
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(job_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
