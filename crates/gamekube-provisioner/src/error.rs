//! Provisioning stages and the error taxonomy
//!
//! Every error belongs to exactly one stage. None of them is retried by the
//! pipeline: validation and template errors need a fix from the caller or an
//! operator, persistence failures are rarely transient within one request,
//! and apply rejections are usually semantic.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::applier::ApplyError;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Checking the raw request attributes
    Validating,
    /// Generating the server identity
    Generating,
    /// Loading and rendering the game template
    Rendering,
    /// Writing the manifest to the store
    Persisting,
    /// Submitting the manifest to the cluster
    Applying,
}

impl Stage {
    /// Stage name as used in logs, metrics and failure responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Generating => "generating",
            Stage::Rendering => "rendering",
            Stage::Persisting => "persisting",
            Stage::Applying => "applying",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the provisioning stages
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Missing or malformed request attribute
    #[error("{message}")]
    Validation {
        /// Attribute name as it appears in the request
        field: &'static str,
        /// Human-readable reason, e.g. "game is required"
        message: String,
    },

    /// No template is registered for the game
    #[error("no template registered for game {game}")]
    TemplateNotFound {
        /// Game code, e.g. "ARK"
        game: String,
    },

    /// The template could not be parsed
    #[error("template for game {game} is invalid: {message}")]
    TemplateSyntax {
        /// Game code
        game: String,
        /// Parser diagnostic
        message: String,
    },

    /// The template parsed but could not be executed
    #[error("template for game {game} failed to render: {message}")]
    TemplateExecution {
        /// Game code
        game: String,
        /// Renderer diagnostic, e.g. the unbound placeholder
        message: String,
    },

    /// Filesystem failure reading a template or writing/reading a manifest
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// Path that was being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The control plane or CLI rejected the manifest
    #[error(transparent)]
    Apply(ApplyError),

    /// The request was cancelled by the caller
    #[error("request cancelled")]
    Cancelled,

    /// The request-scoped deadline expired
    #[error("request deadline of {}s exceeded", timeout.as_secs_f64())]
    DeadlineExceeded {
        /// The configured request timeout
        timeout: Duration,
    },
}

impl ProvisionError {
    /// Create a validation error for `field`
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable name of the error class, reported alongside the cause text
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::TemplateNotFound { .. } => "TemplateNotFoundError",
            Self::TemplateSyntax { .. } => "TemplateSyntaxError",
            Self::TemplateExecution { .. } => "TemplateExecutionError",
            Self::Io { .. } => "IOError",
            Self::Apply(_) => "ApplyError",
            Self::Cancelled => "Cancelled",
            Self::DeadlineExceeded { .. } => "DeadlineExceeded",
        }
    }

    /// Whether the caller sent something it must fix (as opposed to a server-side defect)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::TemplateSyntax { .. } | Self::TemplateExecution { .. }
        )
    }
}

impl From<ApplyError> for ProvisionError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::Cancelled => Self::Cancelled,
            other => Self::Apply(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_pipeline() {
        let mut stages = vec![
            Stage::Applying,
            Stage::Validating,
            Stage::Persisting,
            Stage::Generating,
            Stage::Rendering,
        ];
        stages.sort();
        assert_eq!(
            stages,
            vec![
                Stage::Validating,
                Stage::Generating,
                Stage::Rendering,
                Stage::Persisting,
                Stage::Applying,
            ]
        );
    }

    #[test]
    fn test_stage_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Stage::Rendering).unwrap(),
            "\"rendering\""
        );
        assert_eq!(Stage::Applying.to_string(), "applying");
    }

    #[test]
    fn test_validation_message_is_the_cause() {
        let err = ProvisionError::validation("game", "game is required");
        assert_eq!(err.to_string(), "game is required");
        assert_eq!(err.kind(), "ValidationError");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ProvisionError::io(
            "/var/lib/gamekube/PZ-x.yml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert!(err.to_string().contains("/var/lib/gamekube/PZ-x.yml"));
        assert!(err.to_string().contains("permission denied"));
        assert_eq!(err.kind(), "IOError");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_deadline_message() {
        let err = ProvisionError::DeadlineExceeded {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "request deadline of 1.5s exceeded");
    }

    #[test]
    fn test_apply_error_is_transparent() {
        let err = ProvisionError::from(ApplyError::Rejected {
            code: 409,
            reason: "Conflict".to_string(),
            message: "Apply failed with 1 conflict".to_string(),
        });
        assert!(err.to_string().starts_with("409 Conflict"));
        assert_eq!(err.kind(), "ApplyError");
    }

    #[test]
    fn test_cancelled_apply_is_a_cancellation() {
        let err = ProvisionError::from(ApplyError::Cancelled);
        assert!(matches!(err, ProvisionError::Cancelled));
        assert_eq!(err.kind(), "Cancelled");
        assert!(!err.is_client_error());
    }
}
