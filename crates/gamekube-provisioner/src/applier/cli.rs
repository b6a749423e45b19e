//! Applying manifests with an external client

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Applied, ApplyError, ClusterApplier};
use crate::store::PersistedManifest;

/// Runs `<program> <args...> <manifest path>` for each manifest
#[derive(Debug, Clone)]
pub struct CliApplier {
    program: PathBuf,
    args: Vec<String>,
}

impl CliApplier {
    /// Run `program` with `args`; the manifest path is appended last
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `<program> apply -f <path>` for a kubectl-compatible binary
    pub fn kubectl(program: impl Into<PathBuf>) -> Self {
        Self::new(program, ["apply", "-f"])
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl Default for CliApplier {
    fn default() -> Self {
        Self::kubectl("kubectl")
    }
}

#[async_trait]
impl ClusterApplier for CliApplier {
    async fn apply(
        &self,
        manifest: &PersistedManifest,
        cancel: &CancellationToken,
    ) -> Result<Applied, ApplyError> {
        let program = self.program_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&manifest.location)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            warn!(program = %program, error = %e, "failed to start apply client");
            ApplyError::Spawn {
                program: program.clone(),
                message: e.to_string(),
            }
        })?;

        // The child is owned by the wait future; dropping it on cancel kills the process
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(program = %program, path = %manifest.location.display(), "apply cancelled, killing client");
                return Err(ApplyError::Cancelled);
            }
            output = child.wait_with_output() => output.map_err(|e| ApplyError::Spawn {
                program: program.clone(),
                message: e.to_string(),
            })?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            info!(program = %program, path = %manifest.location.display(), "{}", stdout);
            if !stderr.is_empty() {
                warn!(program = %program, path = %manifest.location.display(), "{}", stderr);
            }
            Ok(Applied {
                summary: stdout,
                warnings: (!stderr.is_empty()).then_some(stderr),
            })
        } else {
            warn!(program = %program, status = %output.status, "{}", stderr);
            Err(ApplyError::CommandFailed {
                program,
                status: output.status.to_string(),
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}
