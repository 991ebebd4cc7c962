use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use fm_core::{CallbackPayload, JobId, JobStatus};
use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::intake::{self, JobDirs};
use crate::notifier::StatusSink;
use crate::registry::{JobGuard, JobRegistry};
use crate::runner::ReconstructionRunner;

/// Admits jobs and drives each one from engine run to callback on its own task.
pub struct Orchestrator {
    config: Arc<ServiceConfig>,
    registry: Arc<JobRegistry>,
    runner: ReconstructionRunner,
    sink: Arc<dyn StatusSink>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<ServiceConfig>,
        registry: Arc<JobRegistry>,
        runner: ReconstructionRunner,
        sink: Arc<dyn StatusSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            runner,
            sink,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Validate and admit a job, then start it in the background.
    ///
    /// Everything that can be rejected is checked here, before the task is
    /// spawned; once this returns `Ok` the outcome is reported via callback only.
    pub fn submit(self: &Arc<Self>, raw_id: Option<&str>) -> Result<JobId, AppError> {
        let (id, dirs) = intake::resolve(&self.config, raw_id)?;
        let Some(guard) = self.registry.try_admit(&id) else {
            warn!(job = %id, "Rejected: reconstruction already running");
            return Err(AppError::AlreadyRunning(id));
        };
        info!(job = %id, input = %dirs.input.display(), output = %dirs.output.display(), "Reconstruction started");

        let this = Arc::clone(self);
        let cancel = guard.cancel_signal();
        let job = id.clone();
        self.supervise(guard, async move { this.run_job(&job, &dirs, cancel).await });
        Ok(id)
    }

    async fn run_job(&self, id: &JobId, dirs: &JobDirs, cancel: watch::Receiver<bool>) -> (JobStatus, String) {
        let outcome = self.runner.run(dirs, cancel).await;
        let (status, message) = outcome.classify();
        info!(job = %id, exit = ?outcome.exit, artifact = outcome.artifact.is_some(), %status, "{message}");
        (status, message)
    }

    /// Run `work` on its own task and report its result once, even if it panics.
    fn supervise<F>(self: &Arc<Self>, guard: JobGuard, work: F)
    where
        F: Future<Output = (JobStatus, String)> + Send + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let (status, message) = match tokio::spawn(work).await {
                Ok(report) => report,
                Err(e) => {
                    error!(job = %guard.id(), "Job task failed: {e}");
                    (JobStatus::Exception, format!("Unexpected error: {e}"))
                }
            };
            this.sink
                .notify(&CallbackPayload::new(guard.id(), status, message))
                .await;
            guard.release(status);
        });
    }

    pub fn cancel(&self, id: &JobId) -> bool {
        let cancelled = self.registry.cancel(id);
        if cancelled {
            info!(job = %id, "Cancellation requested");
        }
        cancelled
    }

    /// Cancel everything in flight and wait for the callbacks to go out.
    pub async fn shutdown(&self) {
        let n = self.registry.cancel_all();
        if n > 0 {
            info!("Cancelling {n} running job(s)");
        }
        self.registry.wait_idle().await;
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use async_trait::async_trait;
    use crate::intake::tests::test_config;
    use crate::notifier::CallbackNotifier;
    use crate::runner::tests::script_runner;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) payloads: Mutex<Vec<CallbackPayload>>,
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        async fn notify(&self, payload: &CallbackPayload) {
            self.payloads.lock().unwrap().push(payload.clone());
        }
    }

    struct Fixture {
        root: tempfile::TempDir,
        sink: Arc<RecordingSink>,
        orchestrator: Arc<Orchestrator>,
    }

    fn fixture(script: &str) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let config = Arc::new(test_config(root.path()));
        let sink = Arc::new(RecordingSink::default());
        let orchestrator = Orchestrator::new(
            config,
            JobRegistry::new(),
            script_runner(script, Duration::from_secs(10)),
            sink.clone(),
        );
        Fixture { root, sink, orchestrator }
    }

    impl Fixture {
        fn upload(&self, id: &str) {
            std::fs::create_dir_all(self.root.path().join("uploads").join(id)).unwrap();
        }

        async fn settle(&self) {
            tokio::time::timeout(Duration::from_secs(10), self.orchestrator.registry().wait_idle())
                .await
                .unwrap();
        }

        fn statuses(&self) -> Vec<(String, JobStatus)> {
            self.sink
                .payloads
                .lock()
                .unwrap()
                .iter()
                .map(|p| (p.identifier.clone(), p.status))
                .collect()
        }
    }

    #[tokio::test]
    async fn test_success_reports_once() {
        let f = fixture("touch \"$4/texturedMesh.obj\"");
        f.upload("abc123");
        let id = f.orchestrator.submit(Some("abc123")).unwrap();
        assert_eq!(id.as_str(), "abc123");
        f.settle().await;
        assert_eq!(f.statuses(), vec![("abc123".to_string(), JobStatus::Success)]);
        assert!(!f.orchestrator.registry().is_running(&id));
    }

    #[tokio::test]
    async fn test_duplicate_rejected_while_running() {
        let f = fixture("sleep 0.5; touch \"$4/texturedMesh.obj\"");
        f.upload("abc123");
        f.orchestrator.submit(Some("abc123")).unwrap();
        let err = f.orchestrator.submit(Some("abc123")).unwrap_err();
        assert!(matches!(err, AppError::AlreadyRunning(_)));
        f.settle().await;
        assert_eq!(f.statuses().len(), 1);

        // Free again once the first run is over.
        f.orchestrator.submit(Some("abc123")).unwrap();
        f.settle().await;
        assert_eq!(f.statuses().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_upload_dir_schedules_nothing() {
        let f = fixture("touch \"$4/texturedMesh.obj\"");
        let err = f.orchestrator.submit(Some("abc123")).unwrap_err();
        assert!(matches!(err, AppError::Pipeline(fm_core::Error::NotFound(_))));
        assert!(f.orchestrator.registry().running().is_empty());
        f.settle().await;
        assert!(f.statuses().is_empty());
    }

    #[tokio::test]
    async fn test_exit_code_does_not_override_artifact() {
        let f = fixture("touch \"$4/texturedMesh.obj\"; exit 1");
        f.upload("a");
        f.orchestrator.submit(Some("a")).unwrap();
        f.settle().await;
        assert_eq!(f.statuses(), vec![("a".to_string(), JobStatus::Success)]);
    }

    #[tokio::test]
    async fn test_rerun_is_judged_on_its_own_artifact() {
        let f = fixture("[ -e \"$2/ok\" ] && touch \"$4/texturedMesh.obj\"; [ -e \"$2/ok\" ] || exit 2");
        f.upload("a");
        std::fs::write(f.root.path().join("uploads/a/ok"), "").unwrap();
        f.orchestrator.submit(Some("a")).unwrap();
        f.settle().await;

        std::fs::remove_file(f.root.path().join("uploads/a/ok")).unwrap();
        f.orchestrator.submit(Some("a")).unwrap();
        f.settle().await;
        assert_eq!(
            f.statuses(),
            vec![("a".to_string(), JobStatus::Success), ("a".to_string(), JobStatus::Error)]
        );
    }

    #[tokio::test]
    async fn test_panicking_job_still_reports_once() {
        let f = fixture("exit 0");
        let id = JobId::parse("a").unwrap();
        let guard = f.orchestrator.registry().try_admit(&id).unwrap();
        async fn crash() -> (JobStatus, String) {
            panic!("engine wrapper crashed")
        }
        f.orchestrator.supervise(guard, crash());
        f.settle().await;
        assert_eq!(f.statuses(), vec![("a".to_string(), JobStatus::Exception)]);
        assert!(!f.orchestrator.registry().is_running(&id));
    }

    #[tokio::test]
    async fn test_clean_exit_without_model() {
        let f = fixture("exit 0");
        f.upload("a");
        f.orchestrator.submit(Some("a")).unwrap();
        f.settle().await;
        assert_eq!(f.statuses(), vec![("a".to_string(), JobStatus::ModelMissing)]);
    }

    #[tokio::test]
    async fn test_jobs_run_concurrently() {
        let f = fixture("sleep 0.3; touch \"$4/texturedMesh.obj\"");
        for id in ["a", "b", "c"] {
            f.upload(id);
            f.orchestrator.submit(Some(id)).unwrap();
        }
        assert_eq!(f.orchestrator.registry().running().len(), 3);
        f.settle().await;
        let mut ids: Vec<String> = f.statuses().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_jobs() {
        let f = fixture("sleep 30");
        f.upload("a");
        f.orchestrator.submit(Some("a")).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::time::timeout(Duration::from_secs(10), f.orchestrator.shutdown())
            .await
            .unwrap();
        assert_eq!(f.statuses(), vec![("a".to_string(), JobStatus::Cancelled)]);
    }

    #[tokio::test]
    async fn test_unreachable_callback_still_completes() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("uploads/a")).unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = format!("http://{}/cb", listener.local_addr().unwrap());
        drop(listener);

        let orchestrator = Orchestrator::new(
            Arc::new(test_config(root.path())),
            JobRegistry::new(),
            script_runner("touch \"$4/texturedMesh.obj\"", Duration::from_secs(10)),
            Arc::new(CallbackNotifier::new(dead, Duration::from_secs(2)).unwrap()),
        );
        let id = orchestrator.submit(Some("a")).unwrap();
        tokio::time::timeout(Duration::from_secs(10), orchestrator.registry().wait_idle())
            .await
            .unwrap();
        assert!(!orchestrator.registry().is_running(&id));
    }
}
