//! Integration tests for schema construction and the update protocol.
//!
//! These tests exercise the full resolve → update → read pipeline against a
//! realistic two-step configuration.

use formstep_state::{
    Casing, FieldConfig, FieldSelection, FormError, MemoryStore, SetFormat, StepConfig,
    StepSchema, UpdateOptions,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Helper functions
// ============================================================================

fn account_schema() -> StepSchema {
    StepSchema::builder()
        .default_casing(Casing::Title)
        .step(
            "step1",
            StepConfig::new("Account")
                .with_description("Account details")
                .field("firstName", FieldConfig::new(""))
                .field("lastName", FieldConfig::new(""))
                .field("age", FieldConfig::new(0).with_type("number")),
        )
        .step(
            "step2",
            StepConfig::new("Profile")
                .field("bio", FieldConfig::new(""))
                .field("tags", FieldConfig::new(json!([10, 20, 30])).with_type("array")),
        )
        .store(Arc::new(MemoryStore::new()))
        .build()
        .unwrap()
}

// ============================================================================
// Construction and resolution
// ============================================================================

#[test]
fn test_step_set_metadata() {
    let schema = account_schema();
    let set = schema.steps();

    assert_eq!(set.first(), 1);
    assert_eq!(set.last(), 2);
    assert_eq!(set.value(), &[1, 2]);
    assert_eq!(set.render(SetFormat::QuotedUnion), "'1' | '2'");
    assert_eq!(set.render(SetFormat::NumberUnion), "1 | 2");
    assert_eq!(set.render(SetFormat::StringArray), "[\"1\", \"2\"]");
}

#[test]
fn test_resolved_document_shape() {
    let schema = account_schema();
    let step1 = schema.get(1).unwrap();

    assert_eq!(step1.data["title"], "Account");
    assert_eq!(step1.data["description"], "Account details");
    assert_eq!(step1.data["nameTransformCasing"], "title");
    assert_eq!(
        step1.data["fields"]["firstName"],
        json!({
            "defaultValue": "",
            "type": "string",
            "nameTransformCasing": "title",
            "label": "First Name",
        })
    );
    assert_eq!(step1.data["fields"]["age"]["type"], "number");
}

#[test]
fn test_first_and_last_views() {
    let schema = account_schema();
    assert_eq!(schema.first().unwrap().step, 1);
    assert_eq!(schema.last().unwrap().step, 2);
    assert_eq!(schema.first().unwrap().data["title"], "Account");
}

#[test]
fn test_non_contiguous_step_numbers() {
    let schema = StepSchema::builder()
        .step("step3", StepConfig::new("C").field("c", FieldConfig::new(0)))
        .step("step7", StepConfig::new("G").field("g", FieldConfig::new(0)))
        .store(Arc::new(MemoryStore::new()))
        .build()
        .unwrap();

    assert_eq!(schema.steps().value(), &[3, 7]);
    assert_eq!(schema.first().unwrap().step, 3);
    assert_eq!(schema.last().unwrap().step, 7);
}

#[test]
fn test_invalid_configured_key_fails_build() {
    let err = StepSchema::builder()
        .step("stage1", StepConfig::new("S").field("a", FieldConfig::new(0)))
        .store(Arc::new(MemoryStore::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, FormError::InvalidStepKey { .. }));
}

#[test]
fn test_build_requires_a_store() {
    let err = StepSchema::builder()
        .step("step1", StepConfig::new("S").field("a", FieldConfig::new(0)))
        .build()
        .unwrap_err();
    assert!(matches!(err, FormError::NoStore));
}

// ============================================================================
// Update protocol
// ============================================================================

#[test]
fn test_single_path_update() {
    let schema = account_schema();
    schema
        .update(
            UpdateOptions::step(1).paths(["fields.firstName.defaultValue"]),
            |ctx| {
                // The context carries the target step's current data.
                assert_eq!(ctx.step_data(1).unwrap()["title"], "Account");
                json!("Ada")
            },
        )
        .unwrap();

    let data = schema.get(1).unwrap().data;
    assert_eq!(data["fields"]["firstName"]["defaultValue"], "Ada");
    // Siblings are untouched.
    assert_eq!(data["fields"]["lastName"]["defaultValue"], "");
}

#[test]
fn test_whole_step_update_allows_value_changes() {
    let schema = account_schema();
    schema
        .update(UpdateOptions::step(2), |ctx| {
            let mut step = ctx.step_data(2).unwrap().clone();
            step["title"] = json!("About You");
            step["fields"]["bio"]["defaultValue"] = json!("hello");
            step
        })
        .unwrap();

    let data = schema.get(2).unwrap().data;
    assert_eq!(data["title"], "About You");
    assert_eq!(data["fields"]["bio"]["defaultValue"], "hello");
}

#[test]
fn test_whole_step_update_rejects_dropped_key() {
    let schema = account_schema();
    let err = schema
        .update(UpdateOptions::step(2), |ctx| {
            let mut step = ctx.step_data(2).unwrap().clone();
            step.as_object_mut().unwrap().remove("title");
            step
        })
        .unwrap_err();

    match err {
        FormError::InvalidKeys { invalid, .. } => assert_eq!(invalid.0, vec!["title"]),
        other => panic!("expected InvalidKeys, got {other:?}"),
    }
}

#[test]
fn test_array_value_replacement_same_types() {
    let schema = account_schema();
    schema
        .update(
            UpdateOptions::step(2).paths(["fields.tags.defaultValue"]),
            |_| json!([1, 2, 3]),
        )
        .unwrap();
    assert_eq!(
        schema.get(2).unwrap().data["fields"]["tags"]["defaultValue"],
        json!([1, 2, 3])
    );
}

#[test]
fn test_array_element_type_change_is_rejected() {
    let schema = account_schema();
    let err = schema
        .update(
            UpdateOptions::step(2).paths(["fields.tags.defaultValue"]),
            |_| json!(["a", "b", "c"]),
        )
        .unwrap_err();

    match err {
        FormError::ShapeMismatch { report } => {
            assert_eq!(report.structural().len(), 3);
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
}

#[test]
fn test_flags_selection_updates_paths() {
    let schema = account_schema();
    let mut flags = BTreeMap::new();
    flags.insert("fields.firstName.defaultValue".to_owned(), true);
    schema
        .update(
            UpdateOptions::step(1).fields(FieldSelection::Flags(flags)),
            |_| json!("Grace"),
        )
        .unwrap();
    assert_eq!(
        schema.get(1).unwrap().data["fields"]["firstName"]["defaultValue"],
        "Grace"
    );
}

#[test]
fn test_unknown_step_error_enumerates_known_keys() {
    let schema = account_schema();
    let err = schema.get(5).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("unknown step 5"));
    assert!(msg.contains("step1 and step2"));
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_whole_step() {
    let schema = account_schema();
    let original = schema.get(1).unwrap().data;

    schema
        .update(
            UpdateOptions::step(1).paths(["fields.firstName.defaultValue"]),
            |_| json!("changed"),
        )
        .unwrap();
    assert_ne!(schema.get(1).unwrap().data, original);

    schema.reset(1, FieldSelection::All).unwrap();
    assert_eq!(schema.get(1).unwrap().data, original);
}

#[test]
fn test_reset_selected_paths_only() {
    let schema = account_schema();
    schema
        .update(
            UpdateOptions::step(1).paths([
                "fields.firstName.defaultValue",
                "fields.lastName.defaultValue",
            ]),
            |_| {
                json!({
                    "fields": {
                        "firstName": {"defaultValue": "Ada"},
                        "lastName": {"defaultValue": "Lovelace"},
                    }
                })
            },
        )
        .unwrap();

    schema
        .reset(
            1,
            FieldSelection::paths(["fields.firstName.defaultValue"]),
        )
        .unwrap();

    let data = schema.get(1).unwrap().data;
    assert_eq!(data["fields"]["firstName"]["defaultValue"], "");
    // The unselected path keeps its updated value.
    assert_eq!(data["fields"]["lastName"]["defaultValue"], "Lovelace");
}
