//! Error types shared by the gamekube crates
//!
//! Errors carry structured fields so a failure can be traced back to the
//! manifest or client setup step that produced it without log correlation.

use thiserror::Error;

/// Main error type for shared gamekube operations
#[derive(Debug, Error)]
pub enum Error {
    /// The Kubernetes client could not be configured
    #[error("kubernetes client setup failed [{step}]: {message}")]
    ClientSetup {
        /// Setup step that failed (e.g., "read_kubeconfig", "infer_config")
        step: &'static str,
        /// Description of what failed
        message: String,
    },

    /// A manifest could not be decoded
    #[error("failed to parse manifest as {format}: {message}")]
    ManifestParse {
        /// Encoding the manifest was decoded as ("YAML" or "JSON")
        format: &'static str,
        /// Decoder diagnostic
        message: String,
    },

    /// A decoded manifest lacks a field needed to address the object
    #[error("manifest missing {field}")]
    ManifestField {
        /// Field path (e.g., "metadata.name")
        field: &'static str,
    },
}

impl Error {
    /// Create a client setup error for `step`
    pub fn client_setup(step: &'static str, msg: impl Into<String>) -> Self {
        Self::ClientSetup {
            step,
            message: msg.into(),
        }
    }

    /// Create a decode error for a manifest in `format`
    pub fn manifest_parse(format: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::ManifestParse {
            format,
            message: msg.to_string(),
        }
    }

    /// Get the field path if this is a missing-field error
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::ManifestField { field } => Some(field),
            _ => None,
        }
    }
}
