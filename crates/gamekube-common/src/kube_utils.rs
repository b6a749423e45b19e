//! Kubernetes helpers: client construction, manifest parsing and server-side apply

use std::path::Path;
use std::time::Duration;

use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
use tracing::trace;

use crate::Error;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from optional kubeconfig path with default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    create_client_with_timeout(kubeconfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client from optional kubeconfig path with custom timeouts
///
/// Without a path the configuration is inferred: in-cluster service account
/// first, then `KUBECONFIG` / `~/.kube/config`.
pub async fn create_client_with_timeout(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::client_setup(
                    "read_kubeconfig",
                    format!("{}: {}", path.display(), e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| Error::client_setup("load_kubeconfig", e.to_string()))?
        }
        None => Config::infer()
            .await
            .map_err(|e| Error::client_setup("infer_config", e.to_string()))?,
    };

    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    Client::try_from(config).map_err(|e| Error::client_setup("build_client", e.to_string()))
}

/// Parsed manifest metadata for applying to Kubernetes
#[derive(Debug, Clone)]
pub struct ManifestMetadata {
    /// The parsed manifest body
    pub value: serde_json::Value,
    /// Resource name
    pub name: String,
    /// Namespace named by the manifest, if any
    pub namespace: Option<String>,
    /// API resource definition
    pub api_resource: ApiResource,
}

impl ManifestMetadata {
    /// Namespace the object should be applied into
    ///
    /// Cluster-scoped kinds never get a namespace; namespaced kinds fall back
    /// to `default_namespace` when the manifest names none.
    pub fn target_namespace<'a>(&'a self, default_namespace: &'a str) -> Option<&'a str> {
        if is_cluster_scoped(&self.api_resource.kind) {
            None
        } else {
            Some(self.namespace.as_deref().unwrap_or(default_namespace))
        }
    }

    /// `Kind/name` for log lines and error messages
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.api_resource.kind, self.name)
    }
}

/// Parse a single-resource YAML (or JSON) manifest and extract its metadata
pub fn parse_manifest(manifest: &str) -> Result<ManifestMetadata, Error> {
    let value: serde_json::Value = if manifest.trim_start().starts_with('{') {
        serde_json::from_str(manifest).map_err(|e| Error::manifest_parse("JSON", e))?
    } else {
        crate::yaml::parse_single_document(manifest).map_err(|e| Error::manifest_parse("YAML", e))?
    };

    let api_version = value
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .ok_or(Error::ManifestField {
            field: "apiVersion",
        })?
        .to_string();

    let kind = value
        .get("kind")
        .and_then(|v| v.as_str())
        .ok_or(Error::ManifestField { field: "kind" })?
        .to_string();

    let name = value
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .ok_or(Error::ManifestField {
            field: "metadata.name",
        })?
        .to_string();

    let namespace = value
        .pointer("/metadata/namespace")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let api_resource = build_api_resource(&api_version, &kind);

    Ok(ManifestMetadata {
        value,
        name,
        namespace,
        api_resource,
    })
}

/// Parse apiVersion into (group, version)
///
/// # Examples
/// ```
/// use gamekube_common::kube_utils::parse_api_version;
///
/// let (group, version) = parse_api_version("apps/v1");
/// assert_eq!(group, "apps");
/// assert_eq!(version, "v1");
///
/// let (group, version) = parse_api_version("v1");
/// assert_eq!(group, "");
/// assert_eq!(version, "v1");
/// ```
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Build an ApiResource from a known apiVersion and kind.
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Known kinds whose plural is not derivable by the fallback rules
const KIND_PLURALS: &[(&str, &str)] = &[
    ("endpoints", "endpoints"),
    ("ingress", "ingresses"),
    ("networkpolicy", "networkpolicies"),
    ("podsecuritypolicy", "podsecuritypolicies"),
    ("priorityclass", "priorityclasses"),
    ("storageclass", "storageclasses"),
];

/// Kinds that live outside any namespace
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "Namespace",
    "Node",
    "PersistentVolume",
    "PriorityClass",
    "StorageClass",
];

/// Whether a kind is cluster-scoped
pub fn is_cluster_scoped(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS.contains(&kind)
}

/// Pluralize a Kubernetes resource kind
///
/// Uses a lookup table for irregular kinds, falling back to simple English
/// pluralization rules.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if let Some((_, plural)) = KIND_PLURALS.iter().find(|(singular, _)| *singular == lower) {
        return (*plural).to_string();
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Server-side apply a parsed manifest
///
/// The apply is not forced: if another field manager owns a field this
/// manifest sets, the API server answers 409 and the error is returned as-is.
/// Resubmitting an identical manifest under the same field manager converges
/// to the same object and succeeds.
pub async fn server_side_apply(
    client: &Client,
    manifest: &ManifestMetadata,
    default_namespace: &str,
    field_manager: &str,
) -> Result<DynamicObject, kube::Error> {
    let api: Api<DynamicObject> = match manifest.target_namespace(default_namespace) {
        Some(ns) => Api::namespaced_with(client.clone(), ns, &manifest.api_resource),
        None => Api::all_with(client.clone(), &manifest.api_resource),
    };

    let params = PatchParams::apply(field_manager);
    let applied = api
        .patch(&manifest.name, &params, &Patch::Apply(&manifest.value))
        .await?;

    trace!(
        resource = %manifest.display_name(),
        namespace = ?manifest.target_namespace(default_namespace),
        "applied manifest"
    );
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_kind() {
        assert_eq!(pluralize_kind("Deployment"), "deployments");
        assert_eq!(pluralize_kind("StatefulSet"), "statefulsets");
        assert_eq!(pluralize_kind("Pod"), "pods");
        assert_eq!(pluralize_kind("Service"), "services");
        assert_eq!(pluralize_kind("Ingress"), "ingresses");
        assert_eq!(pluralize_kind("NetworkPolicy"), "networkpolicies");
        assert_eq!(pluralize_kind("PersistentVolumeClaim"), "persistentvolumeclaims");
        assert_eq!(pluralize_kind("Endpoints"), "endpoints");
        assert_eq!(pluralize_kind("Gateway"), "gateways");
    }

    #[test]
    fn test_parse_api_version() {
        assert_eq!(
            parse_api_version("apps/v1"),
            ("apps".to_string(), "v1".to_string())
        );
        assert_eq!(parse_api_version("v1"), (String::new(), "v1".to_string()));
        assert_eq!(
            parse_api_version("agones.dev/v1"),
            ("agones.dev".to_string(), "v1".to_string())
        );
    }

    #[test]
    fn test_parse_manifest_yaml_deployment() {
        let manifest = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: pz-survivors
  namespace: games
spec:
  replicas: 1
"#;
        let meta = parse_manifest(manifest).expect("deployment manifest should parse");
        assert_eq!(meta.name, "pz-survivors");
        assert_eq!(meta.namespace.as_deref(), Some("games"));
        assert_eq!(meta.api_resource.kind, "Deployment");
        assert_eq!(meta.api_resource.group, "apps");
        assert_eq!(meta.api_resource.plural, "deployments");
        assert_eq!(meta.display_name(), "Deployment/pz-survivors");
        assert_eq!(meta.target_namespace("default"), Some("games"));
    }

    #[test]
    fn test_parse_manifest_json() {
        let manifest = r#"{"apiVersion":"v1","kind":"ConfigMap","metadata":{"name":"pz-settings"}}"#;
        let meta = parse_manifest(manifest).expect("JSON manifest should parse");
        assert_eq!(meta.name, "pz-settings");
        assert_eq!(meta.namespace, None);
        assert_eq!(meta.api_resource.group, "");
        assert_eq!(meta.target_namespace("default"), Some("default"));
    }

    #[test]
    fn test_cluster_scoped_kind_has_no_namespace() {
        let manifest = "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: games\n";
        let meta = parse_manifest(manifest).expect("namespace manifest should parse");
        assert_eq!(meta.target_namespace("default"), None);
    }

    #[test]
    fn test_parse_manifest_missing_fields() {
        let err = parse_manifest("kind: Pod\nmetadata:\n  name: x\n").unwrap_err();
        assert_eq!(err.field(), Some("apiVersion"));

        let err = parse_manifest("apiVersion: v1\nmetadata:\n  name: x\n").unwrap_err();
        assert_eq!(err.field(), Some("kind"));

        let err = parse_manifest("apiVersion: v1\nkind: Pod\nmetadata: {}\n").unwrap_err();
        assert_eq!(err.field(), Some("metadata.name"));
    }

    #[test]
    fn test_parse_manifest_rejects_multi_document() {
        let manifest = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: a\n---\napiVersion: v1\nkind: Pod\nmetadata:\n  name: b\n";
        let err = parse_manifest(manifest).unwrap_err();
        assert!(matches!(err, Error::ManifestParse { format: "YAML", .. }));
    }

    #[test]
    fn test_parse_manifest_invalid_json() {
        assert!(parse_manifest("{not json").is_err());
    }
}
