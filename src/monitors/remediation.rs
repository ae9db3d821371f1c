//! Threshold-triggered remediation
//!
//! When a server's latency exceeds the configured threshold, an external
//! optimization script is launched. The monitor does not wait for the script;
//! its exit status is only logged once it finishes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub enum RemediationError {
    /// The remediation command could not be started
    Launch {
        command: String,
        source: std::io::Error,
    },
}

impl fmt::Display for RemediationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationError::Launch { command, source } => {
                write!(f, "failed to launch '{}': {}", command, source)
            }
        }
    }
}

impl std::error::Error for RemediationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RemediationError::Launch { source, .. } => Some(source),
        }
    }
}

/// Capability to start the corrective action for a server
pub trait Remediator: Send + Sync {
    /// Start the action and return without waiting for it to finish.
    fn launch(&self, server_name: &str) -> Result<(), RemediationError>;
}

/// Result of comparing one latency sample against the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// Latency at or below the threshold, nothing was done
    WithinThreshold,
    /// Threshold exceeded and the action was started
    Launched,
    /// Threshold exceeded but the action could not be started
    LaunchFailed,
}

/// Strictly greater: a sample equal to the threshold is not a breach.
pub fn exceeds_threshold(latency_ms: f64, threshold_ms: f64) -> bool {
    latency_ms > threshold_ms
}

/// Launch remediation for `server_name` if `latency_ms` exceeds `threshold_ms`.
///
/// Launch failures are logged and reported in the outcome, never propagated.
pub fn maybe_optimize(
    remediator: &dyn Remediator,
    server_name: &str,
    latency_ms: f64,
    threshold_ms: f64,
) -> RemediationOutcome {
    if !exceeds_threshold(latency_ms, threshold_ms) {
        return RemediationOutcome::WithinThreshold;
    }

    info!(
        "server {server_name} latency ({latency_ms}ms) exceeds threshold ({threshold_ms}ms), starting optimization"
    );

    match remediator.launch(server_name) {
        Ok(()) => {
            info!("optimization for server {server_name} started");
            RemediationOutcome::Launched
        }
        Err(e) => {
            error!("failed to run optimization for server {server_name}: {e}");
            RemediationOutcome::LaunchFailed
        }
    }
}

/// Runs the configured optimization script as a detached child process.
///
/// `.ps1` scripts are run through `powershell.exe -File`, everything else is
/// executed directly.
#[derive(Debug, Clone)]
pub struct ScriptRemediator {
    script: PathBuf,
}

impl ScriptRemediator {
    pub fn new(script: impl AsRef<Path>) -> Self {
        Self {
            script: script.as_ref().to_path_buf(),
        }
    }

    fn command(&self) -> Command {
        let is_powershell = self
            .script
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ps1"));

        let mut command = if is_powershell {
            let mut command = Command::new("powershell.exe");
            command.arg("-File").arg(&self.script);
            command
        } else {
            Command::new(&self.script)
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl Remediator for ScriptRemediator {
    fn launch(&self, server_name: &str) -> Result<(), RemediationError> {
        let mut child = self
            .command()
            .spawn()
            .map_err(|source| RemediationError::Launch {
                command: self.script.display().to_string(),
                source,
            })?;

        let server_name = server_name.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    debug!("optimization script for {server_name} finished");
                }
                Ok(status) => warn!("optimization script for {server_name} exited with {status}"),
                Err(e) => warn!("could not wait for optimization script of {server_name}: {e}"),
            }
        });

        Ok(())
    }
}
