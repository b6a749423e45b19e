//! Submitting persisted manifests to the cluster
//!
//! Two strategies implement [`ClusterApplier`]:
//! - [`ApiApplier`]: server-side apply through the Kubernetes API
//! - [`CliApplier`]: an external client such as `kubectl apply -f <path>`
//!
//! Exactly one is chosen when the process starts.

mod api;
mod cli;

pub use api::{ApiApplier, KubePatcher, ManifestPatcher};
pub use cli::CliApplier;

#[cfg(test)]
pub use api::MockManifestPatcher;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use mockall::automock;

use crate::store::PersistedManifest;

/// A manifest the cluster accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// What was applied, e.g. `Deployment/pz-<id>` or the client's stdout
    pub summary: String,
    /// Diagnostics reported alongside a success, e.g. kubectl's stderr
    pub warnings: Option<String>,
}

/// Why the cluster (or the client talking to it) refused a manifest
///
/// Messages carry the diagnostic verbatim.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The API server answered with an error status
    #[error("{code} {reason}: {message}")]
    Rejected {
        /// HTTP status code
        code: u16,
        /// Status reason, e.g. "Conflict"
        reason: String,
        /// Status message from the response body
        message: String,
    },

    /// The request never got a status back
    #[error("transport error: {0}")]
    Transport(String),

    /// The persisted bytes are not an applicable manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// The external client could not be started
    #[error("failed to execute {program}: {message}")]
    Spawn {
        /// Program that was invoked
        program: String,
        /// OS error text
        message: String,
    },

    /// The external client exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        /// Program that was invoked
        program: String,
        /// Exit status as reported by the OS
        status: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// Cancelled while the apply was in flight
    #[error("apply cancelled")]
    Cancelled,
}

/// Submits one persisted manifest to the cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApplier: Send + Sync {
    /// Apply `manifest`, giving up when `cancel` fires
    async fn apply(
        &self,
        manifest: &PersistedManifest,
        cancel: &CancellationToken,
    ) -> Result<Applied, ApplyError>;
}
