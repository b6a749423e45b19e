//! Template error types

use std::fmt;

/// Errors that can occur while compiling or rendering a template
#[derive(Debug)]
pub enum TemplateError {
    /// Template source could not be parsed
    Syntax(minijinja::Error),
    /// Template referenced a placeholder with no bound value
    Undefined(minijinja::Error),
    /// Rendering failed for another reason (bad filter argument, type error, ...)
    Render(minijinja::Error),
}

impl TemplateError {
    /// Whether this error came from parsing rather than executing the template
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }

    fn inner(&self) -> &minijinja::Error {
        match self {
            Self::Syntax(e) | Self::Undefined(e) | Self::Render(e) => e,
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(e) => write!(f, "template syntax error: {}", e),
            Self::Undefined(e) => write!(f, "undefined placeholder: {}", e),
            Self::Render(e) => write!(f, "template render error: {}", e),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner())
    }
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::SyntaxError => Self::Syntax(err),
            minijinja::ErrorKind::UndefinedError => Self::Undefined(err),
            _ => Self::Render(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::ErrorKind;

    #[test]
    fn test_from_classifies_by_kind() {
        let err = TemplateError::from(minijinja::Error::new(ErrorKind::SyntaxError, "unclosed"));
        assert!(err.is_syntax());
        assert!(err.to_string().contains("syntax error"));

        let err = TemplateError::from(minijinja::Error::new(ErrorKind::UndefinedError, "Port"));
        assert!(matches!(err, TemplateError::Undefined(_)));
        assert!(err.to_string().contains("undefined placeholder"));

        let err = TemplateError::from(minijinja::Error::new(ErrorKind::InvalidOperation, "nope"));
        assert!(matches!(err, TemplateError::Render(_)));
    }
}
