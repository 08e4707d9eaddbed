use std::{collections::HashMap, io, num::NonZeroUsize, sync::Arc};

use log::{error, info, warn};
use parking_lot::Mutex;
use tokio::{
    sync::Semaphore,
    task::{self, JoinHandle},
};

use super::{JobId, JobRegistry, JobTransition, RegistryError};
use crate::{
    artifacts::{ArtifactError, ArtifactStore},
    request::TrainingRequest,
    training::{TrainingExecutor, TrainingOutcome},
};

/// Accepts training requests and runs each one as a background task, so submitting never waits
/// for the training itself.
///
/// At most `max_concurrent_jobs` jobs train at once, the rest stay pending until a slot frees up.
/// Every completed job hot reloads the serving artifacts.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Arc<JobRegistry>,
    executor: TrainingExecutor,
    store: Arc<ArtifactStore>,
    slots: Semaphore,
    reload_lock: Mutex<()>,
    handles: Mutex<HashMap<JobId, JoinHandle<()>>>,
}

impl JobOrchestrator {
    /// Creates a new `JobOrchestrator`.
    ///
    /// # Arguments
    /// * `registry` - Where the lifecycle of every job is recorded.
    /// * `executor` - Runs the training pipelines.
    /// * `store` - The serving artifacts, replaced after every completed job.
    /// * `max_concurrent_jobs` - The amount of jobs allowed to train at once.
    pub fn new(
        registry: Arc<JobRegistry>,
        executor: TrainingExecutor,
        store: Arc<ArtifactStore>,
        max_concurrent_jobs: NonZeroUsize,
    ) -> Self {
        let inner = Inner {
            registry,
            executor,
            store,
            slots: Semaphore::new(max_concurrent_jobs.get()),
            reload_lock: Mutex::new(()),
            handles: Mutex::new(HashMap::new()),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.inner.registry
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.inner.store
    }

    /// Registers a pending job for `request` and schedules it. Must be called from within a tokio
    /// runtime.
    ///
    /// # Returns
    /// The id of the new job.
    pub fn submit(&self, request: TrainingRequest) -> Result<JobId, RegistryError> {
        let job_id = JobId::generate();
        self.inner.registry.create(job_id.clone())?;
        info!("job {job_id} submitted for {}", request.symbol);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run_job(job_id.clone(), request));

        let mut handles = self.inner.handles.lock();
        handles.retain(|_, handle| !handle.is_finished());
        handles.insert(job_id.clone(), handle);

        Ok(job_id)
    }

    /// Waits for a job's task to finish, including its hot reload.
    ///
    /// # Returns
    /// `false` if the task was not being tracked anymore, either because it had already finished
    /// and was pruned or because it was joined before.
    pub async fn join(&self, job_id: &JobId) -> bool {
        let handle = self.inner.handles.lock().remove(job_id);
        let Some(handle) = handle else {
            return false;
        };

        if let Err(e) = handle.await {
            error!("job {job_id} task ended abruptly: {e}");
        }

        true
    }

    /// Loads the persisted current artifacts and starts serving them. On error the previously
    /// served artifacts, if any, are kept.
    pub async fn reload(&self) -> Result<(), ArtifactError> {
        Arc::clone(&self.inner).reload().await
    }
}

impl Inner {
    async fn run_job(self: Arc<Self>, job_id: JobId, request: TrainingRequest) {
        let slot = self.slots.acquire().await;

        if let Err(e) = self.registry.transition(&job_id, JobTransition::Start) {
            error!("could not start job {job_id}: {e}");
            return;
        }

        let Ok(slot) = slot else {
            let reason = "the execution pool is closed".to_string();
            self.finish(&job_id, JobTransition::Fail(reason));
            return;
        };

        info!("job {job_id} started: training {}", request.symbol);
        let outcome = self.executor.run(&request).await;
        drop(slot);

        match outcome {
            TrainingOutcome::Success {
                metrics,
                artifact_paths,
            } => {
                info!(
                    "job {job_id} completed: mae {:.4}, rmse {:.4}, mape {:.2}%, test loss {:.6}, best {}, model at {}",
                    metrics.mae,
                    metrics.rmse,
                    metrics.mape,
                    metrics.test_loss,
                    metrics.is_best_model,
                    artifact_paths.model.display()
                );

                self.finish(&job_id, JobTransition::Complete(metrics));

                // the job stays completed even if the new model can't be served
                match Arc::clone(&self).reload().await {
                    Ok(()) => info!("hot reload after job {job_id}: serving the new model"),
                    Err(e) => error!(
                        "hot reload after job {job_id} failed, still serving the previous model: {e}"
                    ),
                }
            }
            TrainingOutcome::Failure(e) => {
                warn!("job {job_id} failed: {e}");
                self.finish(&job_id, JobTransition::Fail(e.to_string()));
            }
        }
    }

    fn finish(&self, job_id: &JobId, transition: JobTransition) {
        if let Err(e) = self.registry.transition(job_id, transition) {
            error!("could not finish job {job_id}: {e}");
        }
    }

    async fn reload(self: Arc<Self>) -> Result<(), ArtifactError> {
        let dir = self.executor.repository().dir().to_path_buf();
        let window = self.executor.window().get();

        task::spawn_blocking(move || -> Result<(), ArtifactError> {
            let _guard = self.reload_lock.lock();
            let set = self.executor.repository().load_current()?;

            // a model trained for another window would fail every prediction
            if set.window() != window {
                return Err(ArtifactError::WindowMismatch {
                    expected: window,
                    got: set.window(),
                });
            }

            self.store.swap(set);
            Ok(())
        })
        .await
        .map_err(|e| ArtifactError::Io {
            path: dir,
            source: io::Error::other(e.to_string()),
        })?
    }
}
