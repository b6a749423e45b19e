//! Game server provisioning pipeline
//!
//! Turns a creation request into a running workload:
//!
//! ```text
//! raw attributes ─► validate ─► identity ─► render ─► persist ─► apply
//!                   (request)   (uuid)      (template) (manifest   (server-side apply
//!                                                       store)      or kubectl)
//! ```
//!
//! Each stage runs only if the previous one succeeded. The result is a
//! [`ProvisioningOutcome`] that either carries the new server's identity and
//! manifest location, or names the stage that failed and why.

#![deny(missing_docs)]

pub mod applier;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod renderer;
pub mod request;
pub mod store;

pub use applier::{
    ApiApplier, Applied, ApplyError, CliApplier, ClusterApplier, KubePatcher, ManifestPatcher,
};
pub use error::{ProvisionError, Stage};
pub use identity::ServerIdentity;
pub use pipeline::{FailureReport, Provisioner, ProvisioningOutcome};
pub use renderer::{
    DirTemplateRepository, InMemoryTemplateRepository, RenderedManifest, TemplateRenderer,
    TemplateRepository,
};
pub use request::{Game, RawAttributes, ServerCreationRequest, ServerType};
pub use store::{ManifestKey, ManifestStore, PersistedManifest};
