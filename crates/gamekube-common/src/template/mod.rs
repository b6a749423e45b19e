//! Manifest templating
//!
//! Templates are plain-text Kubernetes manifests with Jinja-style placeholders
//! rendered by minijinja:
//!
//! - `{{ ID }}`, `{{ Size }}` and friends are substituted verbatim
//! - `{% if %}...{% endif %}` and `{% for %}...{% endfor %}` are available
//! - Go-style field references (`{{ .ID }}`) are accepted and treated as `{{ ID }}`
//! - `{{ Name | quote }}` emits a value as an escaped YAML double-quoted scalar
//!
//! Output is configuration text, so no HTML escaping is ever applied, and a
//! reference to an unbound placeholder is an error rather than an empty string.

mod context;
mod engine;
mod error;
mod filters;

pub use context::{TemplateContext, TemplateContextBuilder};
pub use engine::TemplateEngine;
pub use error::TemplateError;
