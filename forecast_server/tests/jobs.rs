use std::{env, num::NonZeroUsize, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDate;
use machine_learning::{
    arch::{Model, ModelSpec, TrainedModel},
    scaler::MinMaxScaler,
};
use tokio::{sync::Semaphore, time};
use uuid::Uuid;

use forecast_server::{
    artifacts::{ArtifactError, ArtifactRepository, ArtifactSet, ArtifactStore},
    jobs::{JobId, JobOrchestrator, JobRecord, JobRegistry, JobStatus},
    request::TrainingRequest,
    source::{InMemorySource, PricePoint, PriceSource, SourceError, synthetic_closes},
    training::TrainingExecutor,
};

const TIMEOUT: Duration = Duration::from_secs(60);

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn temp_repository() -> Arc<ArtifactRepository> {
    let dir = env::temp_dir().join(format!("forecast-jobs-{}", Uuid::new_v4()));
    Arc::new(ArtifactRepository::new(dir))
}

fn orchestrator(
    source: Arc<dyn PriceSource>,
    repository: Arc<ArtifactRepository>,
    window: usize,
    max_concurrent_jobs: usize,
) -> JobOrchestrator {
    let executor = TrainingExecutor::new(
        source,
        repository,
        NonZeroUsize::new(window).unwrap(),
        0.8,
    );

    JobOrchestrator::new(
        Arc::new(JobRegistry::new()),
        executor,
        Arc::new(ArtifactStore::new()),
        NonZeroUsize::new(max_concurrent_jobs).unwrap(),
    )
}

fn request(symbol: &str, epochs: usize, batch_size: usize) -> TrainingRequest {
    TrainingRequest {
        symbol: symbol.to_string(),
        start_date: start_date(),
        end_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        epochs,
        batch_size,
        ..TrainingRequest::default()
    }
}

async fn finish(orchestrator: &JobOrchestrator, job_id: &JobId) -> JobRecord {
    time::timeout(TIMEOUT, orchestrator.join(job_id))
        .await
        .expect("job timed out");

    orchestrator.registry().get(job_id.as_str()).unwrap()
}

/// Waits until one of `job_ids` is running.
async fn wait_for_running<'a>(
    orchestrator: &JobOrchestrator,
    job_ids: &[&'a JobId],
) -> &'a JobId {
    let poll = async {
        loop {
            let running = job_ids.iter().find(|job_id| {
                orchestrator.registry().get(job_id.as_str()).unwrap().status == JobStatus::Running
            });

            if let Some(job_id) = running {
                return *job_id;
            }

            time::sleep(Duration::from_millis(5)).await;
        }
    };

    time::timeout(TIMEOUT, poll).await.expect("no job started")
}

/// Artifacts of a service configured with a window of 3.
fn window_of_three() -> ArtifactSet {
    let spec = ModelSpec::sequence_regressor(3, 2, 1, 0.).unwrap();
    let size = spec.build(0).size();
    let model = TrainedModel::new(spec, vec![0.; size]).unwrap();
    ArtifactSet::new(model, MinMaxScaler::fit(&[1., 2.]).unwrap())
}

/// Holds every request until the test lets it through.
struct GatedSource {
    inner: InMemorySource,
    gate: Semaphore,
}

#[async_trait]
impl PriceSource for GatedSource {
    async fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, SourceError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        self.inner.history(symbol, start, end).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completed_and_failed_jobs() {
    let source = InMemorySource::new();
    source.insert_closes("TEST", start_date(), &synthetic_closes(70));
    source.insert_closes("SHORT", start_date(), &synthetic_closes(10));

    let repository = temp_repository();
    let orchestrator = orchestrator(Arc::new(source), Arc::clone(&repository), 60, 1);
    assert!(orchestrator.store().snapshot().is_none());

    let job_id = orchestrator.submit(request("TEST", 1, 2)).unwrap();
    assert!(job_id.as_str().starts_with("train-"));

    let record = finish(&orchestrator, &job_id).await;
    assert_eq!(record.status, JobStatus::Completed, "{:?}", record.error);
    assert_eq!(record.error, None);

    let metrics = record.result.unwrap();
    assert_eq!(metrics.symbol, "TEST");
    assert!(metrics.mae >= 0. && metrics.rmse >= 0. && metrics.mape >= 0.);
    assert_eq!(metrics.loss_history.len(), 1);
    assert!(metrics.is_best_model);

    // hot reloaded
    let served = orchestrator.store().snapshot().unwrap();
    assert_eq!(*served, repository.load_current().unwrap());
    assert_eq!(served.window(), 60);

    let job_id = orchestrator.submit(request("SHORT", 1, 2)).unwrap();
    let record = finish(&orchestrator, &job_id).await;
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.result, None);
    assert!(record.error.unwrap().contains("insufficient data"));

    // a failed job leaves the serving model alone
    assert!(Arc::ptr_eq(&served, &orchestrator.store().snapshot().unwrap()));

    std::fs::remove_dir_all(repository.dir()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submit_does_not_wait_for_training() {
    let inner = InMemorySource::new();
    inner.insert_closes("TEST", start_date(), &synthetic_closes(40));
    let source = Arc::new(GatedSource {
        inner,
        gate: Semaphore::new(0),
    });

    let repository = temp_repository();
    let orchestrator = orchestrator(source.clone(), Arc::clone(&repository), 10, 1);

    let first = orchestrator.submit(request("TEST", 2, 4)).unwrap();
    let second = orchestrator.submit(request("TEST", 2, 4)).unwrap();

    // one job holds the only slot while its data fetch is held back
    let running = wait_for_running(&orchestrator, &[&first, &second]).await;
    let waiting = if running == &first { &second } else { &first };
    assert_eq!(
        orchestrator.registry().get(waiting.as_str()).unwrap().status,
        JobStatus::Pending
    );

    source.gate.add_permits(2);

    assert_eq!(finish(&orchestrator, &first).await.status, JobStatus::Completed);
    assert_eq!(finish(&orchestrator, &second).await.status, JobStatus::Completed);

    std::fs::remove_dir_all(repository.dir()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn best_checkpoint_is_the_minimum_loss() {
    let source = InMemorySource::new();
    source.insert_closes("TEST", start_date(), &synthetic_closes(60));

    let repository = temp_repository();
    let orchestrator = orchestrator(Arc::new(source), Arc::clone(&repository), 10, 1);

    let mut best: Option<(f64, ArtifactSet)> = None;

    for seed in [1, 2, 3, 4] {
        let request = TrainingRequest {
            seed: Some(seed),
            hidden_layer_size: 8,
            ..request("TEST", 3, 8)
        };

        let job_id = orchestrator.submit(request).unwrap();
        let record = finish(&orchestrator, &job_id).await;
        let metrics = record.result.unwrap();
        let current = repository.load_current().unwrap();

        let improves = best
            .as_ref()
            .is_none_or(|(loss, _)| metrics.test_loss < *loss);
        assert_eq!(metrics.is_best_model, improves, "seed {seed}");

        if improves {
            best = Some((metrics.test_loss, current));
        }
    }

    let (loss, set) = best.unwrap();
    assert_eq!(repository.best_loss().unwrap(), Some(loss));
    assert_eq!(repository.load_best().unwrap(), set);

    std::fs::remove_dir_all(repository.dir()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_jobs_all_finish() {
    let source = InMemorySource::new();
    source.insert_closes("A", start_date(), &synthetic_closes(40));
    source.insert_closes("B", start_date(), &synthetic_closes(50));

    let repository = temp_repository();
    let orchestrator = orchestrator(Arc::new(source), Arc::clone(&repository), 10, 2);

    let job_ids: Vec<JobId> = ["A", "B", "A", "B"]
        .into_iter()
        .map(|symbol| orchestrator.submit(request(symbol, 2, 4)).unwrap())
        .collect();

    for job_id in &job_ids {
        let record = finish(&orchestrator, job_id).await;
        assert_eq!(record.status, JobStatus::Completed, "{:?}", record.error);
    }

    assert_eq!(orchestrator.registry().len(), 4);
    assert!(orchestrator.store().is_loaded());

    std::fs::remove_dir_all(repository.dir()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reload_without_artifacts() {
    let orchestrator = orchestrator(Arc::new(InMemorySource::new()), temp_repository(), 10, 1);

    let err = orchestrator.reload().await.unwrap_err();
    assert!(matches!(err, ArtifactError::NotFound(_)));
    assert!(!orchestrator.store().is_loaded());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reload_keeps_serving_when_the_window_differs() {
    let source = InMemorySource::new();
    source.insert_closes("TEST", start_date(), &synthetic_closes(40));

    let repository = temp_repository();
    let orchestrator = orchestrator(Arc::new(source), Arc::clone(&repository), 10, 1);

    let job_id = orchestrator.submit(request("TEST", 1, 4)).unwrap();
    assert_eq!(finish(&orchestrator, &job_id).await.status, JobStatus::Completed);
    let served = orchestrator.store().snapshot().unwrap();

    repository.persist(&window_of_three(), 1e9).unwrap();

    let err = orchestrator.reload().await.unwrap_err();
    assert!(matches!(
        err,
        ArtifactError::WindowMismatch {
            expected: 10,
            got: 3
        }
    ));
    assert!(Arc::ptr_eq(&served, &orchestrator.store().snapshot().unwrap()));

    std::fs::remove_dir_all(repository.dir()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reload_without_a_previous_model_stays_empty_on_a_window_mismatch() {
    let repository = temp_repository();
    let source = Arc::new(InMemorySource::new());
    let orchestrator = orchestrator(source, Arc::clone(&repository), 10, 1);

    repository.persist(&window_of_three(), 0.5).unwrap();

    assert!(matches!(
        orchestrator.reload().await,
        Err(ArtifactError::WindowMismatch { .. })
    ));
    assert!(!orchestrator.store().is_loaded());

    std::fs::remove_dir_all(repository.dir()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_job() {
    let orchestrator = orchestrator(Arc::new(InMemorySource::new()), temp_repository(), 10, 1);

    assert!(orchestrator.registry().get("train-unknown").is_err());
    assert!(!orchestrator.join(&JobId::from("train-unknown".to_string())).await);
}
