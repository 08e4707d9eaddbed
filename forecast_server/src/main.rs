use std::{future, io, sync::Arc};

use log::{info, warn};
use tokio::{net::TcpListener, signal};

use forecast_server::{
    artifacts::{ArtifactError, ArtifactRepository, ArtifactStore},
    config::{DataSourceKind, ServiceConfig},
    http::{self, AppState},
    inference::InferenceService,
    jobs::{JobOrchestrator, JobRegistry},
    source::{InMemorySource, PriceSource, YahooSource},
    training::TrainingExecutor,
};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = ServiceConfig::from_env().map_err(io::Error::other)?;

    let source: Arc<dyn PriceSource> = match config.data_source {
        DataSourceKind::Yahoo => {
            Arc::new(YahooSource::new(&config.yahoo_base_url).map_err(io::Error::other)?)
        }
        DataSourceKind::Memory => {
            info!("using the synthetic in-memory price source");
            Arc::new(InMemorySource::synthetic())
        }
    };

    let repository = Arc::new(ArtifactRepository::new(config.artifacts_dir.clone()));
    let store = Arc::new(ArtifactStore::new());

    let executor = TrainingExecutor::new(
        Arc::clone(&source),
        Arc::clone(&repository),
        config.window_size,
        config.train_split,
    );
    let orchestrator = JobOrchestrator::new(
        Arc::new(JobRegistry::new()),
        executor,
        Arc::clone(&store),
        config.max_concurrent_jobs,
    );

    match orchestrator.reload().await {
        Ok(()) => info!("serving the artifacts in {}", repository.dir().display()),
        Err(ArtifactError::NotFound(path)) => {
            info!("no model at {} yet, train one first", path.display())
        }
        Err(e) => warn!("could not load the artifacts, starting without a model: {e}"),
    }

    let inference = InferenceService::new(store, source, config.window_size.get());
    let app = http::router(AppState::new(orchestrator, inference, repository));

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("listening at {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("received ctrl-c, shutting down"),
        Err(e) => {
            warn!("could not listen for ctrl-c, running until killed: {e}");
            future::pending::<()>().await;
        }
    }
}
