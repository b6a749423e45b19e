//! Template engine for manifest rendering
//!
//! Uses minijinja with its default Jinja delimiters:
//! - Variables: `{{...}}`
//! - Blocks: `{%...%}`
//! - Comments: `{#...#}`
//!
//! Auto-escaping is disabled and undefined values are strict errors. Free-form
//! values go through the `quote` filter to land as a single YAML scalar.

use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use super::context::TemplateContext;
use super::error::TemplateError;
use super::filters;

/// Template engine for manifest placeholder resolution
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine {
    /// Create a new template engine
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        // Manifest files end with a newline and YAML tools expect it to stay
        env.set_keep_trailing_newline(true);
        env.add_filter("quote", filters::quote);

        Self { env }
    }

    /// Check that a template parses, without requiring any bindings
    ///
    /// Parsing completes before evaluation starts, so rendering against an
    /// empty context reports syntax errors first; anything else is ignored.
    pub fn validate_syntax(&self, template: &str) -> Result<(), TemplateError> {
        let normalized = normalize_go_field_refs(template);
        match self.env.render_str(&normalized, ()) {
            Err(e) if e.kind() == minijinja::ErrorKind::SyntaxError => Err(TemplateError::Syntax(e)),
            _ => Ok(()),
        }
    }

    /// Render a template string with the given context
    ///
    /// # Errors
    ///
    /// - `TemplateError::Syntax` if the template cannot be parsed
    /// - `TemplateError::Undefined` if a placeholder has no bound value
    /// - `TemplateError::Render` for any other evaluation failure
    pub fn render(&self, template: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
        let normalized = normalize_go_field_refs(template);
        self.env
            .render_str(&normalized, ctx.to_value())
            .map_err(TemplateError::from)
    }
}

/// Rewrite Go-style field references inside `{{ ... }}` to plain names.
///
/// `{{ .ID }}` becomes `{{ ID }}`. Attribute access such as `{{ a.b }}` and
/// dots inside quoted strings or numbers are left alone.
fn normalize_go_field_refs(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        result.push_str(&remaining[..start + 2]);
        remaining = &remaining[start + 2..];

        if let Some(end) = remaining.find("}}") {
            result.push_str(&strip_leading_dots(&remaining[..end]));
            result.push_str("}}");
            remaining = &remaining[end + 2..];
        } else {
            // Unterminated expression; let the parser report it
            result.push_str(remaining);
            remaining = "";
        }
    }

    result.push_str(remaining);
    result
}

fn strip_leading_dots(expr: &str) -> String {
    let mut result = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                result.push(ch);
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                result.push(ch);
            }
            '.' if !in_single_quote && !in_double_quote => {
                let follows_operand = result
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == ')' || c == ']');
                let starts_ident = chars
                    .peek()
                    .is_some_and(|c| c.is_alphabetic() || *c == '_');
                if follows_operand || !starts_ident {
                    result.push('.');
                }
            }
            _ => result.push(ch),
        }
    }

    result
}
