//! Values bound into a manifest template

use std::collections::BTreeMap;

use minijinja::Value;

/// Named placeholder values available to a template
///
/// Keys are used exactly as written, so `ID` is referenced as `{{ ID }}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Create a new builder for TemplateContext
    pub fn builder() -> TemplateContextBuilder {
        TemplateContextBuilder::default()
    }

    /// Convert to minijinja Value for rendering
    pub fn to_value(&self) -> Value {
        Value::from_iter(self.values.clone())
    }
}

/// Builder for TemplateContext
#[derive(Debug, Default)]
pub struct TemplateContextBuilder {
    values: BTreeMap<String, String>,
}

impl TemplateContextBuilder {
    /// Bind a placeholder to a value, replacing any earlier binding
    pub fn bind(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Build the TemplateContext
    pub fn build(self) -> TemplateContext {
        TemplateContext {
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_binds_values() {
        let ctx = TemplateContext::builder()
            .bind("ID", "abc")
            .bind("Size", "PZ_SM")
            .bind("Size", "PZ_LG")
            .build();

        let value = ctx.to_value();
        assert_eq!(value.get_attr("ID").unwrap().as_str(), Some("abc"));
        assert_eq!(value.get_attr("Size").unwrap().as_str(), Some("PZ_LG"));
        assert!(value.get_attr("Name").unwrap().is_undefined());
    }

    #[test]
    fn test_to_value_exposes_keys() {
        let ctx = TemplateContext::builder().bind("Name", "survivors").build();
        let value = ctx.to_value();
        let name = value.get_attr("Name").expect("Name should be an attribute");
        assert_eq!(name.as_str(), Some("survivors"));
    }
}
