//! Server identity

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Globally unique identity of one provisioned server
///
/// Generated once per request and used verbatim as the manifest key suffix,
/// the `ID` template binding and the cluster object name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServerIdentity(Uuid);

impl ServerIdentity {
    /// Generate a fresh random (v4) identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
