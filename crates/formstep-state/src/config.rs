//! Raw step/field configuration.
//!
//! Configuration is immutable input: it is consumed once by the resolver and
//! never mutated afterwards.

use crate::casing::Casing;
use crate::validate::Validator;
use serde_json::Value;
use std::collections::BTreeMap;

/// The default field type tag.
pub const DEFAULT_FIELD_TYPE: &str = "string";

/// Label configuration for a field.
///
/// Tri-state on purpose: an explicit label, an explicitly suppressed label,
/// and the default of deriving one from the field name are three different
/// things, and an empty-string label must never be conflated with "no label".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Label {
    /// Derive the label from the field name via the effective casing.
    #[default]
    Derive,
    /// Use this label verbatim.
    Explicit(String),
    /// No label at all.
    Suppressed,
}

/// Configuration for a single field.
#[derive(Clone, Debug)]
pub struct FieldConfig {
    /// The field's initial value.
    pub default_value: Value,
    /// Type tag; defaults to `"string"` when unset.
    pub field_type: Option<String>,
    /// Casing override; defaults to the enclosing step's casing.
    pub casing: Option<Casing>,
    /// Label configuration.
    pub label: Label,
}

impl FieldConfig {
    /// Create a field with a default value and all metadata unset.
    pub fn new(default_value: impl Into<Value>) -> Self {
        Self {
            default_value: default_value.into(),
            field_type: None,
            casing: None,
            label: Label::Derive,
        }
    }

    /// Set the type tag (builder pattern).
    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    /// Set a field-level casing override (builder pattern).
    pub fn with_casing(mut self, casing: Casing) -> Self {
        self.casing = Some(casing);
        self
    }

    /// Set an explicit label (builder pattern).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Label::Explicit(label.into());
        self
    }

    /// Suppress the label entirely (builder pattern).
    pub fn no_label(mut self) -> Self {
        self.label = Label::Suppressed;
        self
    }
}

/// Configuration for a single step.
#[derive(Clone, Debug, Default)]
pub struct StepConfig {
    /// Display title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Casing override for this step; defaults to the schema-wide casing.
    pub casing: Option<Casing>,
    /// The step's fields by name.
    pub fields: BTreeMap<String, FieldConfig>,
    /// Optional validator run against the draft of default values.
    pub validate_fields: Option<Validator>,
}

impl StepConfig {
    /// Create a step with a title and no fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the description (builder pattern).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set a step-level casing override (builder pattern).
    pub fn with_casing(mut self, casing: Casing) -> Self {
        self.casing = Some(casing);
        self
    }

    /// Add a field (builder pattern).
    pub fn field(mut self, name: impl Into<String>, config: FieldConfig) -> Self {
        self.fields.insert(name.into(), config);
        self
    }

    /// Attach a field-set validator (builder pattern).
    pub fn validate_fields(mut self, validator: Validator) -> Self {
        self.validate_fields = Some(validator);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_builder() {
        let field = FieldConfig::new("")
            .with_type("email")
            .with_casing(Casing::Kebab)
            .with_label("E-mail");
        assert_eq!(field.default_value, json!(""));
        assert_eq!(field.field_type.as_deref(), Some("email"));
        assert_eq!(field.casing, Some(Casing::Kebab));
        assert_eq!(field.label, Label::Explicit("E-mail".into()));
    }

    #[test]
    fn test_label_tri_state() {
        assert_eq!(FieldConfig::new(0).label, Label::Derive);
        assert_eq!(FieldConfig::new(0).no_label().label, Label::Suppressed);
        // An explicit empty label is still a label.
        assert_eq!(
            FieldConfig::new(0).with_label("").label,
            Label::Explicit(String::new())
        );
    }

    #[test]
    fn test_step_builder() {
        let step = StepConfig::new("Account")
            .with_description("Account details")
            .field("firstName", FieldConfig::new(""))
            .field("lastName", FieldConfig::new(""));
        assert_eq!(step.title, "Account");
        assert_eq!(step.fields.len(), 2);
        assert!(step.casing.is_none());
    }
}
