//! Typed state container for multi-step form schemas.
//!
//! A schema is configured as a map of `step{N}` keys to step configurations,
//! resolved once into an enriched runtime document (defaults, type tags,
//! casings, derived labels), and then mutated exclusively through a guarded
//! update protocol: select a part of a step, produce a new value for it, and
//! the engine validates, structurally compares, writes, persists, and
//! notifies, all or nothing.
//!
//! # Quick start
//!
//! ```
//! use formstep_state::{
//!     Casing, FieldConfig, MemoryStore, StepConfig, StepSchema, UpdateOptions,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # fn main() -> formstep_state::FormResult<()> {
//! let schema = StepSchema::builder()
//!     .default_casing(Casing::Title)
//!     .step(
//!         "step1",
//!         StepConfig::new("Account")
//!             .field("firstName", FieldConfig::new(""))
//!             .field("lastName", FieldConfig::new("")),
//!     )
//!     .step(
//!         "step2",
//!         StepConfig::new("Profile").field("bio", FieldConfig::new("")),
//!     )
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()?;
//!
//! // Labels were derived from field names during resolution.
//! let step1 = schema.get(1)?;
//! assert_eq!(step1.data["fields"]["firstName"]["label"], "First Name");
//!
//! // Updates target a selection and go through structural comparison.
//! schema.update(
//!     UpdateOptions::step(1).paths(["fields.firstName.defaultValue"]),
//!     |_ctx| json!("Ada"),
//! )?;
//! assert_eq!(
//!     schema.get(1)?.data["fields"]["firstName"]["defaultValue"],
//!     "Ada"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Module map
//!
//! - [`casing`]: field-name casing transformations and label derivation.
//! - [`path`]: dotted paths and the pure deep-access utilities.
//! - [`compare`]: structural comparison with per-path mismatch reports.
//! - [`validate`]: the synchronous validator adapter.
//! - [`config`] / [`resolver`]: raw step configuration and its resolution.
//! - [`step`]: `step{N}` keys and the derived step-number set.
//! - [`storage`]: the injected key-value store and its JSON adapter.
//! - [`engine`]: the stateful schema with updates, resets, helpers, and
//!   subscriptions.

pub mod casing;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod observe;
pub mod path;
pub mod resolver;
pub mod step;
pub mod storage;
pub mod validate;

pub use casing::{change_casing, change_casing_by_name, Casing};
pub use compare::{
    compare_at_paths, compare_values, value_type_name, CompareReport, Mismatch, MismatchReason,
};
pub use config::{FieldConfig, Label, StepConfig, DEFAULT_FIELD_TYPE};
pub use engine::{
    FieldSelection, Helper, HelperCtx, StepHandle, StepSchema, StepSchemaBuilder, StepSelection,
    StepView, UpdateCtx, UpdateOptions, UpdateScope, ValidatedHelper,
};
pub use error::{invariant, join_natural, FormError, FormResult, KeyList};
pub use observe::Subscription;
pub use path::{
    enumerate_paths, normalize_paths, read_at, read_at_many, write_at, Path, Seg,
};
pub use resolver::{resolve_steps, ResolvedField, ResolvedSchema, ResolvedStep};
pub use step::{SetFormat, StepKey, StepSet};
pub use storage::{KeyValueStore, MemoryStore, StorageAdapter, DEFAULT_STORAGE_KEY};
pub use validate::{Issue, IssueList, Outcome, Validator};
