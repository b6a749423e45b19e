//! Server-side apply through the Kubernetes API

use std::sync::Arc;

use async_trait::async_trait;
use gamekube_common::kube_utils::{self, ManifestMetadata};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use super::{Applied, ApplyError, ClusterApplier};
use crate::store::PersistedManifest;

/// Control-plane seam for server-side apply
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ManifestPatcher: Send + Sync {
    /// Server-side apply one parsed manifest
    async fn patch(&self, manifest: &ManifestMetadata) -> Result<(), kube::Error>;
}

/// [`ManifestPatcher`] backed by a live kube client
#[derive(Clone)]
pub struct KubePatcher {
    client: Client,
    default_namespace: String,
    field_manager: String,
}

impl KubePatcher {
    /// Patch through `client` as `field_manager`, into `default_namespace`
    /// when a manifest names no namespace
    pub fn new(
        client: Client,
        default_namespace: impl Into<String>,
        field_manager: impl Into<String>,
    ) -> Self {
        Self {
            client,
            default_namespace: default_namespace.into(),
            field_manager: field_manager.into(),
        }
    }
}

#[async_trait]
impl ManifestPatcher for KubePatcher {
    async fn patch(&self, manifest: &ManifestMetadata) -> Result<(), kube::Error> {
        kube_utils::server_side_apply(
            &self.client,
            manifest,
            &self.default_namespace,
            &self.field_manager,
        )
        .await
        .map(|_| ())
    }
}

/// Applies manifests with server-side apply
#[derive(Clone)]
pub struct ApiApplier {
    patcher: Arc<dyn ManifestPatcher>,
}

impl ApiApplier {
    /// Create an applier over `patcher`
    pub fn new(patcher: Arc<dyn ManifestPatcher>) -> Self {
        Self { patcher }
    }

    /// Create an applier over a live client
    pub fn from_client(
        client: Client,
        default_namespace: impl Into<String>,
        field_manager: impl Into<String>,
    ) -> Self {
        Self::new(Arc::new(KubePatcher::new(
            client,
            default_namespace,
            field_manager,
        )))
    }
}

#[async_trait]
impl ClusterApplier for ApiApplier {
    async fn apply(
        &self,
        manifest: &PersistedManifest,
        cancel: &CancellationToken,
    ) -> Result<Applied, ApplyError> {
        let text = std::str::from_utf8(&manifest.bytes)
            .map_err(|e| ApplyError::InvalidManifest(format!("not valid UTF-8: {}", e)))?;
        let parsed = kube_utils::parse_manifest(text)
            .map_err(|e| ApplyError::InvalidManifest(e.to_string()))?;
        let resource = parsed.display_name();

        debug!(resource = %resource, path = %manifest.location.display(), "server-side applying manifest");

        // Dropping the patch future aborts the in-flight HTTP request
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApplyError::Cancelled),
            result = self.patcher.patch(&parsed) => result,
        };
        result.map_err(from_kube_error)?;

        info!(resource = %resource, "manifest applied");
        Ok(Applied {
            summary: resource,
            warnings: None,
        })
    }
}

fn from_kube_error(err: kube::Error) -> ApplyError {
    match err {
        kube::Error::Api(response) => ApplyError::Rejected {
            code: response.code,
            reason: response.reason,
            message: response.message,
        },
        other => ApplyError::Transport(other.to_string()),
    }
}
