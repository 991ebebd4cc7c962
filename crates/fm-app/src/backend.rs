mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use crate::config::ServiceConfig;
use crate::notifier::{CallbackNotifier, StatusSink};
use crate::orchestrator::Orchestrator;
use crate::registry::JobRegistry;
use crate::runner::ReconstructionRunner;
use crate::backend::routes::api_routes;
use crate::backend::state::MeshState;

pub use crate::backend::schemas::{
    HealthResponse, JobStatusResponse, ReconstructRequest, ReconstructResponse, UploadResponse,
};

/// HTTP front of the reconstruction service.
pub struct MeshBackend {
    config: Arc<ServiceConfig>,
    orchestrator: Arc<Orchestrator>,
}

impl MeshBackend {
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        let notifier = CallbackNotifier::new(config.callback_url.clone(), config.callback_timeout)?;
        Ok(Self::with_sink(config, Arc::new(notifier)))
    }

    pub fn with_sink(config: ServiceConfig, sink: Arc<dyn StatusSink>) -> Self {
        let runner = ReconstructionRunner::from_config(&config);
        let config = Arc::new(config);
        let orchestrator = Orchestrator::new(Arc::clone(&config), JobRegistry::new(), runner, sink);
        Self { config, orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn router(&self) -> Router {
        Router::new()
            .merge(api_routes())
            .with_state(Arc::new(MeshState::new(Arc::clone(&self.orchestrator))))
    }

    /// Bind the configured port and serve until `shutdown` resolves, then
    /// cancel running jobs and wait for their callbacks.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener, shutdown).await
    }

    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            "Starting reconstruction server on {} (engine: {}, uploads: {})",
            listener.local_addr()?,
            self.config.reconstruct_program.display(),
            self.config.upload_root.display()
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped, draining jobs");
        let drain = self.config.callback_timeout + Duration::from_secs(30);
        if tokio::time::timeout(drain, self.orchestrator.shutdown()).await.is_err() {
            tracing::warn!("Jobs still running after {}s, exiting anyway", drain.as_secs());
        }
        Ok(())
    }
}
