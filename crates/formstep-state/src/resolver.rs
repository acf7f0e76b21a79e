//! Step resolution: raw configuration in, enriched runtime values out.
//!
//! Resolution is deterministic and fail-fast: the first configuration error
//! aborts, and no partial schema is ever produced.

use crate::casing::{change_casing, Casing};
use crate::compare::value_type_name;
use crate::config::{Label, StepConfig, DEFAULT_FIELD_TYPE};
use crate::error::{invariant, FormError, FormResult, KeyList};
use crate::step::{StepKey, StepSet};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A field with all optional configuration populated.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedField {
    /// The field's initial value (possibly coerced by `validate_fields`).
    pub default_value: Value,
    /// Type tag.
    pub field_type: String,
    /// Effective casing.
    pub casing: Casing,
    /// Display label; `None` only when explicitly suppressed.
    pub label: Option<String>,
}

impl ResolvedField {
    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("defaultValue".into(), self.default_value.clone());
        obj.insert("type".into(), Value::String(self.field_type.clone()));
        obj.insert(
            "nameTransformCasing".into(),
            Value::String(self.casing.name().to_owned()),
        );
        if let Some(label) = &self.label {
            obj.insert("label".into(), Value::String(label.clone()));
        }
        Value::Object(obj)
    }
}

/// A step with defaults applied and every field resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStep {
    /// Display title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Effective casing.
    pub casing: Casing,
    /// Resolved fields by name.
    pub fields: BTreeMap<String, ResolvedField>,
}

impl ResolvedStep {
    /// Render this step as its runtime document value.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("title".into(), Value::String(self.title.clone()));
        if let Some(description) = &self.description {
            obj.insert("description".into(), Value::String(description.clone()));
        }
        obj.insert(
            "nameTransformCasing".into(),
            Value::String(self.casing.name().to_owned()),
        );
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.to_value()))
            .collect();
        obj.insert("fields".into(), Value::Object(fields));
        Value::Object(obj)
    }
}

/// The fully resolved schema: steps plus the derived step-number set.
#[derive(Clone, Debug)]
pub struct ResolvedSchema {
    /// Resolved steps keyed by step key.
    pub steps: BTreeMap<StepKey, ResolvedStep>,
    /// Derived step-number metadata.
    pub set: StepSet,
}

impl ResolvedSchema {
    /// Render the whole schema as the runtime document
    /// (`{"step1": {...}, "step2": {...}}`). This is also the persisted
    /// wire format.
    pub fn to_value(&self) -> Value {
        let obj: Map<String, Value> = self
            .steps
            .iter()
            .map(|(key, step)| (key.to_string(), step.to_value()))
            .collect();
        Value::Object(obj)
    }
}

/// Resolve a raw step configuration map.
///
/// Per step: the key must match `step{N}`, the field set must be non-empty,
/// the effective casing is the step's own override or the schema default,
/// and each field is enriched with its type tag, casing, and label. When a
/// `validate_fields` validator is present it runs against a draft of plain
/// default values; its output must keep the field key set identical, and
/// its values replace the defaults while presentation metadata re-merges
/// from the original per-field configuration.
pub fn resolve_steps(
    config: &BTreeMap<String, StepConfig>,
    default_casing: Casing,
) -> FormResult<ResolvedSchema> {
    let mut steps = BTreeMap::new();
    let mut numbers = Vec::with_capacity(config.len());

    for (raw_key, step) in config {
        let key = StepKey::parse(raw_key)?;
        if step.fields.is_empty() {
            return Err(FormError::EmptyFields {
                step: key.to_string(),
            });
        }

        let step_casing = step.casing.unwrap_or(default_casing);
        let defaults = resolve_defaults(step, &key)?;

        let fields: BTreeMap<String, ResolvedField> = step
            .fields
            .iter()
            .map(|(name, field)| {
                let casing = field.casing.unwrap_or(step_casing);
                let label = match &field.label {
                    Label::Explicit(label) => Some(label.clone()),
                    Label::Suppressed => None,
                    Label::Derive => Some(change_casing(name, casing)),
                };
                let resolved = ResolvedField {
                    default_value: defaults[name].clone(),
                    field_type: field
                        .field_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_FIELD_TYPE.to_owned()),
                    casing,
                    label,
                };
                (name.clone(), resolved)
            })
            .collect();

        numbers.push(key.number());
        steps.insert(
            key,
            ResolvedStep {
                title: step.title.clone(),
                description: step.description.clone(),
                casing: step_casing,
                fields,
            },
        );
    }

    let set = StepSet::new(numbers)?;
    Ok(ResolvedSchema { steps, set })
}

/// Produce the per-field default values for a step, running the optional
/// field-set validator against the draft object.
fn resolve_defaults(step: &StepConfig, key: &StepKey) -> FormResult<BTreeMap<String, Value>> {
    let plain: BTreeMap<String, Value> = step
        .fields
        .iter()
        .map(|(name, field)| (name.clone(), field.default_value.clone()))
        .collect();

    let Some(validator) = &step.validate_fields else {
        return Ok(plain);
    };

    let draft: Map<String, Value> = plain
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let output = validator.run(&Value::Object(draft))?;

    invariant(output.is_object(), || {
        format!(
            "field validator for {key} must return an object, got {}",
            value_type_name(&output)
        )
    })?;
    let output = output.as_object().expect("checked above");

    let missing: Vec<String> = plain
        .keys()
        .filter(|name| !output.contains_key(*name))
        .cloned()
        .collect();
    let extra: Vec<String> = output
        .keys()
        .filter(|name| !plain.contains_key(*name))
        .cloned()
        .collect();
    if !missing.is_empty() || !extra.is_empty() {
        return Err(FormError::ValidatorKeyMismatch {
            step: key.to_string(),
            missing: KeyList(missing),
            extra: KeyList(extra),
        });
    }

    Ok(output
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect())
}
