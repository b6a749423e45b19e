//! Common types for gamekube: errors, manifest handling, templating and telemetry

#![deny(missing_docs)]

pub mod error;
pub mod kube_utils;
pub mod metrics;
pub mod telemetry;
pub mod template;
pub mod yaml;

pub use error::Error;

/// Field manager recorded by server-side apply when none is configured
pub const DEFAULT_FIELD_MANAGER: &str = "gamekube";

/// Namespace used for manifests that do not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Label carrying the server identity on every provisioned object
pub const SERVER_ID_LABEL: &str = "gamekube.io/server-id";
