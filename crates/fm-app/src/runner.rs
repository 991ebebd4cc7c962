use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{info, warn};
use fm_core::{artifact, JobStatus};
use crate::config::ServiceConfig;
use crate::intake::JobDirs;

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessExit {
    /// Process ended on its own; `None` when killed by a signal.
    Exited(Option<i32>),
    LaunchFailed(String),
    TimedOut(Duration),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    pub exit: ProcessExit,
    /// Raw mesh, if the engine left one behind.
    pub artifact: Option<PathBuf>,
}

impl ProcessOutcome {
    /// Terminal status and message. The artifact decides, not the exit code.
    pub fn classify(&self) -> (JobStatus, String) {
        match (&self.exit, &self.artifact) {
            (ProcessExit::LaunchFailed(e), _) => (JobStatus::Exception, format!("Unexpected error: {e}")),
            (ProcessExit::TimedOut(limit), _) => (
                JobStatus::Timeout,
                format!("Reconstruction timed out after {}s", limit.as_secs()),
            ),
            (ProcessExit::Cancelled, _) => (JobStatus::Cancelled, "Reconstruction cancelled".to_string()),
            (ProcessExit::Exited(_), Some(_)) => (JobStatus::Success, "Model reconstructed".to_string()),
            (ProcessExit::Exited(Some(0)), None) => (
                JobStatus::ModelMissing,
                "Reconstruction finished, but model not found".to_string(),
            ),
            (ProcessExit::Exited(Some(code)), None) => (
                JobStatus::Error,
                format!("Reconstruction failed: exit status {code}"),
            ),
            (ProcessExit::Exited(None), None) => (
                JobStatus::Error,
                "Reconstruction failed: terminated by signal".to_string(),
            ),
        }
    }
}

/// Launches the photogrammetry engine for one job and waits for it.
#[derive(Debug, Clone)]
pub struct ReconstructionRunner {
    program: PathBuf,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl ReconstructionRunner {
    pub fn new(program: impl Into<PathBuf>, leading_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            leading_args,
            timeout,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            config.reconstruct_program.clone(),
            config.reconstruct_args.clone(),
            config.reconstruct_timeout,
        )
    }

    /// Run `{program} {args..} --input <in> --output <out>` to completion,
    /// killing it on timeout or when `cancel` turns true.
    pub async fn run(&self, dirs: &JobDirs, mut cancel: watch::Receiver<bool>) -> ProcessOutcome {
        // The output directory outlives runs, so a mesh from an earlier run must not count for this one.
        let stale = artifact::raw_mesh_path(&dirs.output);
        match tokio::fs::remove_file(&stale).await {
            Ok(()) => info!("Removed previous {}", stale.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return ProcessOutcome {
                    exit: ProcessExit::LaunchFailed(format!(
                        "cannot clear previous {}: {e}",
                        stale.display()
                    )),
                    artifact: None,
                };
            }
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("--input")
            .arg(&dirs.input)
            .arg("--output")
            .arg(&dirs.output)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        // Own process group, so workers the engine forks can be killed with it.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ProcessOutcome {
                    exit: ProcessExit::LaunchFailed(format!(
                        "failed to start {}: {e}",
                        self.program.display()
                    )),
                    artifact: None,
                };
            }
        };
        info!(
            "Started {} (pid {:?}) for {}",
            self.program.display(),
            child.id(),
            dirs.input.display()
        );

        let cancelled = async {
            if cancel.wait_for(|c| *c).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        let exit = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => ProcessExit::Exited(status.code()),
                Err(e) => ProcessExit::LaunchFailed(format!("failed to wait for engine: {e}")),
            },
            _ = tokio::time::sleep(self.timeout) => {
                warn!("Engine exceeded {}s, killing it", self.timeout.as_secs());
                kill(&mut child).await;
                ProcessExit::TimedOut(self.timeout)
            }
            _ = cancelled => {
                warn!("Cancellation requested, killing engine");
                kill(&mut child).await;
                ProcessExit::Cancelled
            }
        };

        let artifact = match exit {
            ProcessExit::Exited(_) => Some(artifact::raw_mesh_path(&dirs.output))
                .filter(|_| artifact::verify(&dirs.output)),
            _ => None,
        };
        ProcessOutcome { exit, artifact }
    }
}

/// Kill the engine's whole process group, then the engine itself, and reap it.
async fn kill(child: &mut tokio::process::Child) {
    kill_group(child);
    if let Err(e) = child.kill().await {
        warn!("Failed to kill engine: {e}");
    }
}

#[cfg(unix)]
fn kill_group(child: &tokio::process::Child) {
    let Some(pid) = child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child.
    if unsafe { libc::killpg(pid, libc::SIGKILL) } != 0 {
        let e = std::io::Error::last_os_error();
        if e.raw_os_error() != Some(libc::ESRCH) {
            warn!("Failed to kill engine process group {pid}: {e}");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &tokio::process::Child) {}
