//! Provisioning orchestrator
//!
//! Drives one request through the stages in order:
//!
//! ```text
//! Validating ─► Generating ─► Rendering ─► Persisting ─► Applying ─► Done
//!      │             │            │             │            │
//!      └─────────────┴────────────┴─────┬───────┴────────────┘
//!                                       ▼
//!                               Failed(stage, cause)
//! ```
//!
//! There is no retry and no rollback. A manifest persisted before a failed
//! apply stays on disk. Cancellation and the request deadline are checked
//! around every stage; the stage that was running is the one reported.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gamekube_common::metrics::ProvisionTimer;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::applier::ClusterApplier;
use crate::error::{ProvisionError, Stage};
use crate::identity::ServerIdentity;
use crate::renderer::TemplateRenderer;
use crate::request::{RawAttributes, ServerCreationRequest};
use crate::store::{ManifestKey, ManifestStore};

/// Final result of one provisioning invocation
#[derive(Debug)]
pub enum ProvisioningOutcome {
    /// Every stage succeeded
    Done {
        /// The new server's identity
        identity: ServerIdentity,
        /// Where its manifest was persisted
        location: PathBuf,
    },
    /// A stage failed; later stages did not run
    Failed {
        /// Stage that was running
        stage: Stage,
        /// Why it failed
        error: ProvisionError,
    },
}

impl ProvisioningOutcome {
    /// Whether the pipeline reached `Done`
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// The failed stage, if any
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Done { .. } => None,
            Self::Failed { stage, .. } => Some(*stage),
        }
    }
}

/// Failure summary as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// Stage that was running
    pub stage: Stage,
    /// Error class, e.g. "ValidationError"
    pub kind: &'static str,
    /// Cause text
    pub error: String,
}

impl FailureReport {
    /// Summarize a stage failure
    pub fn new(stage: Stage, error: &ProvisionError) -> Self {
        Self {
            stage,
            kind: error.kind(),
            error: error.to_string(),
        }
    }
}

/// Runs server creation requests through the pipeline
///
/// Cheap to share behind an `Arc`; invocations hold no state between each other.
pub struct Provisioner {
    renderer: TemplateRenderer,
    store: ManifestStore,
    applier: Arc<dyn ClusterApplier>,
    timeout: Option<Duration>,
}

impl Provisioner {
    /// Assemble a provisioner from its components
    pub fn new(
        renderer: TemplateRenderer,
        store: ManifestStore,
        applier: Arc<dyn ClusterApplier>,
    ) -> Self {
        Self {
            renderer,
            store,
            applier,
            timeout: None,
        }
    }

    /// Bound every invocation by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create one game server from raw request attributes
    pub async fn create_server(
        &self,
        raw: &RawAttributes,
        cancel: &CancellationToken,
    ) -> ProvisioningOutcome {
        let mut timer = ProvisionTimer::start("unknown");
        let guard = StageGuard {
            cancel,
            deadline: self.timeout.map(|t| (Instant::now() + t, t)),
        };

        match self.run(raw, &guard, &mut timer).await {
            Ok((identity, location)) => {
                info!(server_id = %identity, path = %location.display(), "game server provisioned");
                timer.done();
                ProvisioningOutcome::Done { identity, location }
            }
            Err((stage, error)) => {
                warn!(stage = %stage, kind = error.kind(), error = %error, "provisioning failed");
                timer.failed(stage.as_str());
                ProvisioningOutcome::Failed { stage, error }
            }
        }
    }

    async fn run(
        &self,
        raw: &RawAttributes,
        guard: &StageGuard<'_>,
        timer: &mut ProvisionTimer,
    ) -> Result<(ServerIdentity, PathBuf), (Stage, ProvisionError)> {
        let request = guard
            .run(Stage::Validating, async {
                ServerCreationRequest::from_attributes(raw)
            })
            .await?;
        timer.set_game(request.game.as_str());

        let identity = guard
            .run(Stage::Generating, async { Ok(ServerIdentity::generate()) })
            .await?;
        info!(
            server_id = %identity,
            game = %request.game,
            server_type = %request.server_type,
            name = %request.name,
            "provisioning game server"
        );

        let manifest = guard
            .run(Stage::Rendering, self.renderer.render(&request, &identity))
            .await?;

        let key = ManifestKey::new(request.game, &identity);
        let location = guard
            .run(Stage::Persisting, self.store.write(&key, manifest))
            .await?;

        let applied = guard
            .run(Stage::Applying, async {
                // Apply exactly what is on disk
                let persisted = self.store.read(&location).await?;
                self.applier
                    .apply(&persisted, guard.cancel)
                    .await
                    .map_err(ProvisionError::from)
            })
            .await?;
        debug!(
            server_id = %identity,
            summary = %applied.summary,
            warnings = ?applied.warnings,
            "manifest applied"
        );

        Ok((identity, location))
    }
}

/// Races each stage against cancellation and the request deadline
struct StageGuard<'a> {
    cancel: &'a CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl StageGuard<'_> {
    async fn run<T, F>(&self, stage: Stage, fut: F) -> Result<T, (Stage, ProvisionError)>
    where
        F: Future<Output = Result<T, ProvisionError>>,
    {
        debug!(stage = %stage, "entering stage");
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProvisionError::Cancelled),
            timeout = deadline_elapsed(self.deadline) => {
                Err(ProvisionError::DeadlineExceeded { timeout })
            }
            result = fut => result,
        };
        result.map_err(|e| (stage, e))
    }
}

async fn deadline_elapsed(deadline: Option<(Instant, Duration)>) -> Duration {
    match deadline {
        Some((at, timeout)) => {
            tokio::time::sleep_until(at).await;
            timeout
        }
        None => std::future::pending().await,
    }
}
