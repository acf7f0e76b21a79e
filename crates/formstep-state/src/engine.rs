//! The stateful step-schema engine.
//!
//! Owns the current resolved document and exposes the mutation protocol:
//! `update`/`reset` with three field-selection shapes, helper-function
//! factories with scoped write access, and the persist/notify pipeline.
//!
//! Every mutation runs the same sequence: validate the selection shape,
//! structurally compare the new value against the current one, write, persist
//! the whole document, notify subscribers. Nothing is written unless both
//! validation and comparison succeed, so a failed call leaves the document
//! untouched.

use crate::casing::Casing;
use crate::compare::{compare_at_paths, compare_values};
use crate::config::StepConfig;
use crate::error::{FormError, FormResult, KeyList};
use crate::observe::{Observers, Subscription};
use crate::path::{read_at, read_at_many, write_at, Path};
use crate::resolver::resolve_steps;
use crate::step::{StepKey, StepSet};
use crate::storage::{KeyValueStore, StorageAdapter, DEFAULT_STORAGE_KEY};
use crate::validate::Validator;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

const LOCK: &str = "schema state lock poisoned";

/// Which part of a step an `update`/`reset` call targets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldSelection {
    /// The whole step record (title, casing, fields).
    #[default]
    All,
    /// An explicit list of dotted paths into the step's data.
    Paths(Vec<String>),
    /// An object-of-paths map; every value must be `true`.
    Flags(BTreeMap<String, bool>),
}

impl FieldSelection {
    /// Convenience constructor for the path-list shape.
    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection::Paths(paths.into_iter().map(Into::into).collect())
    }
}

/// Which steps a helper function is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepSelection {
    /// Every live step.
    All,
    /// An explicit list of step keys (`"step1"`).
    Keys(Vec<String>),
    /// An object-of-keys map; every value must be `true`.
    Flags(BTreeMap<String, bool>),
}

impl StepSelection {
    /// Convenience constructor for the key-list shape.
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StepSelection::Keys(keys.into_iter().map(Into::into).collect())
    }
}

type CtxDataFn = Box<dyn Fn(&Value) -> Map<String, Value> + Send + Sync>;

/// Options for an [`StepSchema::update`] call.
pub struct UpdateOptions {
    step: u32,
    fields: FieldSelection,
    ctx_data: Option<CtxDataFn>,
}

impl UpdateOptions {
    /// Target a step; the selection defaults to the whole step.
    pub fn step(step: u32) -> Self {
        Self {
            step,
            fields: FieldSelection::All,
            ctx_data: None,
        }
    }

    /// Set the field selection (builder pattern).
    pub fn fields(mut self, fields: FieldSelection) -> Self {
        self.fields = fields;
        self
    }

    /// Select dotted paths (builder pattern).
    pub fn paths<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields(FieldSelection::paths(paths))
    }

    /// Derive extra read-only context entries from the other steps'
    /// snapshot (builder pattern). The returned keys are merged into the
    /// `ctx` passed to the updater.
    pub fn ctx_data(
        mut self,
        f: impl Fn(&Value) -> Map<String, Value> + Send + Sync + 'static,
    ) -> Self {
        self.ctx_data = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for UpdateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateOptions")
            .field("step", &self.step)
            .field("fields", &self.fields)
            .field("ctx_data", &self.ctx_data.is_some())
            .finish()
    }
}

/// The read-only context passed to an updater.
#[derive(Clone, Debug)]
pub struct UpdateCtx {
    ctx: Value,
}

impl UpdateCtx {
    /// The whole context object: the target step's current data under its
    /// step key, plus any `ctx_data` extras.
    pub fn ctx(&self) -> &Value {
        &self.ctx
    }

    /// The current data of a step present in this context.
    pub fn step_data(&self, step: u32) -> Option<&Value> {
        self.ctx.get(StepKey::new(step).to_string())
    }

    /// A context entry by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.ctx.get(key)
    }
}

/// A step's current data together with its number.
#[derive(Clone, Debug, PartialEq)]
pub struct StepView {
    /// The step number.
    pub step: u32,
    /// The step's current resolved data.
    pub data: Value,
}

/// A field selection classified into one of two write plans.
#[derive(Clone, Debug)]
enum Plan {
    /// Replace the whole step record.
    Whole,
    /// Replace the values at these normalized paths.
    Slices(Vec<Path>),
}

fn classify_selection(step_value: &Value, selection: &FieldSelection) -> FormResult<Plan> {
    let raw: Vec<String> = match selection {
        FieldSelection::All => return Ok(Plan::Whole),
        FieldSelection::Paths(paths) => paths.clone(),
        FieldSelection::Flags(flags) => {
            if let Some((key, _)) = flags.iter().find(|(_, enabled)| !**enabled) {
                return Err(FormError::invalid_selection(format!(
                    "field selection flags must all be true; got false for {key:?}"
                )));
            }
            flags.keys().cloned().collect()
        }
    };
    if raw.is_empty() {
        return Err(FormError::EmptySelection);
    }

    let mut paths = Vec::with_capacity(raw.len());
    for p in &raw {
        let path = Path::parse_dotted(p);
        if path.is_empty() {
            return Err(FormError::invalid_selection(format!(
                "empty path {p:?} in field selection"
            )));
        }
        paths.push(path);
    }
    let normalized = crate::path::normalize_paths(&paths);
    for path in &normalized {
        if read_at(step_value, path).is_none() {
            return Err(FormError::path_not_found(path.clone()));
        }
    }
    Ok(Plan::Slices(normalized))
}

fn resolve_step_selection(set: &StepSet, selection: &StepSelection) -> FormResult<Vec<StepKey>> {
    let raw: Vec<String> = match selection {
        StepSelection::All => {
            return Ok(set.value().iter().map(|n| StepKey::new(*n)).collect());
        }
        StepSelection::Keys(keys) => keys.clone(),
        StepSelection::Flags(flags) => {
            if let Some((key, _)) = flags.iter().find(|(_, enabled)| !**enabled) {
                return Err(FormError::invalid_selection(format!(
                    "step selection flags must all be true; got false for {key:?}"
                )));
            }
            flags.keys().cloned().collect()
        }
    };
    if raw.is_empty() {
        return Err(FormError::EmptySelection);
    }

    let mut resolved = Vec::with_capacity(raw.len());
    let mut invalid = Vec::new();
    for key in &raw {
        match StepKey::parse(key) {
            Ok(parsed) if set.is_valid_step_number(parsed.number()) => resolved.push(parsed),
            _ => invalid.push(key.clone()),
        }
    }
    if !invalid.is_empty() {
        return Err(FormError::invalid_keys(invalid, set.keys()));
    }
    Ok(resolved)
}

struct Inner {
    current: Value,
    initial: Value,
    set: StepSet,
    storage: StorageAdapter,
}

impl Inner {
    fn check_step(&self, step: u32) -> FormResult<()> {
        if self.set.is_valid_step_number(step) {
            Ok(())
        } else {
            Err(FormError::UnknownStep {
                step,
                known: KeyList(self.set.keys()),
            })
        }
    }

    fn step_value(&self, key: StepKey) -> FormResult<Value> {
        self.current
            .get(key.to_string())
            .cloned()
            .ok_or_else(|| FormError::path_not_found(Path::root().key(key.to_string())))
    }
}

/// Builder for [`StepSchema`].
///
/// The key-value store is injected explicitly; building without one is a
/// configuration error.
pub struct StepSchemaBuilder {
    steps: BTreeMap<String, StepConfig>,
    default_casing: Casing,
    store: Option<Arc<dyn KeyValueStore>>,
    storage_key: String,
}

impl StepSchemaBuilder {
    fn new() -> Self {
        Self {
            steps: BTreeMap::new(),
            default_casing: Casing::default(),
            store: None,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
        }
    }

    /// Add a step configuration under a `step{N}` key.
    pub fn step(mut self, key: impl Into<String>, config: StepConfig) -> Self {
        self.steps.insert(key.into(), config);
        self
    }

    /// Set the schema-wide default casing (defaults to `title`).
    pub fn default_casing(mut self, casing: Casing) -> Self {
        self.default_casing = casing;
        self
    }

    /// Inject the key-value store used for persistence.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the storage key (defaults to [`DEFAULT_STORAGE_KEY`]).
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Resolve the configuration, sync from storage, and build the schema.
    ///
    /// If a persisted document exists under the storage key it replaces the
    /// freshly resolved defaults wholesale.
    pub fn build(self) -> FormResult<StepSchema> {
        let store = self.store.ok_or(FormError::NoStore)?;
        let resolved = resolve_steps(&self.steps, self.default_casing)?;
        let initial = resolved.to_value();
        let storage = StorageAdapter::new(store, self.storage_key);

        let current = match storage.get::<Value>()? {
            Some(persisted) => {
                tracing::debug!(key = storage.key(), "restored persisted step state");
                persisted
            }
            None => initial.clone(),
        };

        Ok(StepSchema {
            inner: Arc::new(RwLock::new(Inner {
                current,
                initial,
                set: resolved.set,
                storage,
            })),
            observers: Observers::new(),
        })
    }
}

/// The step-schema state container.
///
/// Cloning the handle shares the underlying state; the engine instance is
/// the sole writer of its document, and every read goes through the same
/// instance, so read-after-write always sees the latest value.
///
/// # Example
///
/// ```
/// use formstep_state::{FieldConfig, MemoryStore, StepConfig, StepSchema, UpdateOptions};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let schema = StepSchema::builder()
///     .step("step1", StepConfig::new("Step 1").field("firstName", FieldConfig::new("")))
///     .store(Arc::new(MemoryStore::new()))
///     .build()
///     .unwrap();
///
/// schema
///     .update(
///         UpdateOptions::step(1).paths(["fields.firstName.defaultValue"]),
///         |_ctx| json!("Ada"),
///     )
///     .unwrap();
///
/// let step = schema.get(1).unwrap();
/// assert_eq!(step.data["fields"]["firstName"]["defaultValue"], "Ada");
/// ```
#[derive(Clone)]
pub struct StepSchema {
    inner: Arc<RwLock<Inner>>,
    observers: Observers,
}

impl std::fmt::Debug for StepSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSchema").finish_non_exhaustive()
    }
}

impl StepSchema {
    /// Start building a schema.
    pub fn builder() -> StepSchemaBuilder {
        StepSchemaBuilder::new()
    }

    /// The derived step-number set.
    pub fn steps(&self) -> StepSet {
        self.inner.read().expect(LOCK).set.clone()
    }

    /// A snapshot of the whole current document.
    pub fn snapshot(&self) -> Value {
        self.inner.read().expect(LOCK).current.clone()
    }

    /// The current data for a step.
    pub fn get(&self, step: u32) -> FormResult<StepView> {
        let inner = self.inner.read().expect(LOCK);
        inner.check_step(step)?;
        let data = inner.step_value(StepKey::new(step))?;
        Ok(StepView { step, data })
    }

    /// The first (minimum-numbered) step.
    pub fn first(&self) -> FormResult<StepView> {
        let first = self.inner.read().expect(LOCK).set.first();
        self.get(first)
    }

    /// The last (maximum-numbered) step.
    pub fn last(&self) -> FormResult<StepView> {
        let last = self.inner.read().expect(LOCK).set.last();
        self.get(last)
    }

    /// A handle bound to one step.
    pub fn step(&self, step: u32) -> FormResult<StepHandle> {
        self.inner.read().expect(LOCK).check_step(step)?;
        Ok(StepHandle {
            schema: self.clone(),
            step,
        })
    }

    /// Subscribe to document snapshots published after each mutation.
    pub fn subscribe(&self, listener: impl Fn(&Value) + Send + Sync + 'static) -> Subscription {
        self.observers.subscribe(listener)
    }

    /// Apply an updater to the selected part of a step.
    ///
    /// The updater receives a read-only context and must return the new
    /// value for the selection: the whole step record for
    /// [`FieldSelection::All`] (with an identical key set), or a value
    /// shaped like the current value at the selected (normalized) paths.
    /// Value changes are free; shape changes are rejected before anything
    /// is written.
    pub fn update(
        &self,
        options: UpdateOptions,
        updater: impl FnOnce(&UpdateCtx) -> Value,
    ) -> FormResult<()> {
        let UpdateOptions {
            step,
            fields,
            ctx_data,
        } = options;
        let key = StepKey::new(step);

        let (plan, ctx) = {
            let inner = self.inner.read().expect(LOCK);
            inner.check_step(step)?;
            let step_value = inner.step_value(key)?;
            let plan = classify_selection(&step_value, &fields)?;

            let mut ctx = Map::new();
            ctx.insert(key.to_string(), step_value);
            if let Some(derive) = &ctx_data {
                let mut others = inner.current.clone();
                if let Some(obj) = others.as_object_mut() {
                    obj.remove(&key.to_string());
                }
                for (k, v) in derive(&others) {
                    ctx.insert(k, v);
                }
            }
            (plan, UpdateCtx {
                ctx: Value::Object(ctx),
            })
        };

        // The state lock is not held while the updater runs, so scoped
        // dispatch inside helper functions may re-enter `update`.
        let returned = updater(&ctx);

        self.apply(key, &plan, returned, "update")
    }

    /// Restore the selected part of a step to its original resolved
    /// defaults. Uses the same selection shapes and the same
    /// compare-then-write path as [`StepSchema::update`].
    pub fn reset(&self, step: u32, fields: FieldSelection) -> FormResult<()> {
        let key = StepKey::new(step);
        let (plan, restored) = {
            let inner = self.inner.read().expect(LOCK);
            inner.check_step(step)?;
            let step_value = inner.step_value(key)?;
            let plan = classify_selection(&step_value, &fields)?;

            let initial_step = inner
                .initial
                .get(key.to_string())
                .cloned()
                .ok_or_else(|| FormError::path_not_found(Path::root().key(key.to_string())))?;
            let restored = match &plan {
                Plan::Whole => initial_step,
                Plan::Slices(paths) => read_at_many(&initial_step, paths)
                    .ok_or_else(|| FormError::path_not_found(paths[0].clone()))?,
            };
            (plan, restored)
        };

        self.apply(key, &plan, restored, "reset")
    }

    /// Build a reusable helper function bound to a step selection.
    ///
    /// The helper re-reads the live document on every call; it is not a
    /// snapshot closure.
    pub fn create_helper_fn<R>(
        &self,
        selection: StepSelection,
        f: impl Fn(&HelperCtx) -> FormResult<R> + Send + Sync + 'static,
    ) -> FormResult<Helper<R>> {
        let steps = {
            let inner = self.inner.read().expect(LOCK);
            resolve_step_selection(&inner.set, &selection)?
        };
        Ok(Helper {
            schema: self.clone(),
            steps,
            f: Arc::new(f),
        })
    }

    /// Build a helper function that validates its input before running.
    pub fn create_helper_fn_with<R>(
        &self,
        selection: StepSelection,
        validator: Validator,
        f: impl Fn(&HelperCtx, &Value) -> FormResult<R> + Send + Sync + 'static,
    ) -> FormResult<ValidatedHelper<R>> {
        let steps = {
            let inner = self.inner.read().expect(LOCK);
            resolve_step_selection(&inner.set, &selection)?
        };
        Ok(ValidatedHelper {
            schema: self.clone(),
            steps,
            validator,
            f: Arc::new(f),
        })
    }

    fn helper_ctx(&self, steps: &[StepKey]) -> FormResult<HelperCtx> {
        let ctx = {
            let inner = self.inner.read().expect(LOCK);
            let mut ctx = Map::new();
            for key in steps {
                ctx.insert(key.to_string(), inner.step_value(*key)?);
            }
            ctx
        };
        Ok(HelperCtx {
            ctx: Value::Object(ctx),
            scope: UpdateScope {
                schema: self.clone(),
                allowed: steps.to_vec(),
            },
        })
    }

    /// Shared compare → write → persist → notify tail of every mutation.
    fn apply(&self, key: StepKey, plan: &Plan, returned: Value, op: &'static str) -> FormResult<()> {
        let snapshot = {
            let mut inner = self.inner.write().expect(LOCK);
            let key_str = key.to_string();
            let current_step = inner.step_value(key)?;

            let new_step = match plan {
                Plan::Whole => {
                    if let (Some(cur), Some(ret)) =
                        (current_step.as_object(), returned.as_object())
                    {
                        let mut differing: Vec<String> = cur
                            .keys()
                            .filter(|k| !ret.contains_key(*k))
                            .cloned()
                            .collect();
                        differing.extend(
                            ret.keys().filter(|k| !cur.contains_key(*k)).cloned(),
                        );
                        if !differing.is_empty() {
                            return Err(FormError::invalid_keys(
                                differing,
                                cur.keys().cloned().collect(),
                            ));
                        }
                    }
                    let report = compare_values(&current_step, &returned);
                    if !report.ok() {
                        return Err(FormError::ShapeMismatch { report });
                    }
                    returned
                }
                Plan::Slices(paths) => {
                    let report = compare_at_paths(&current_step, paths, &returned)?;
                    if !report.ok() {
                        return Err(FormError::ShapeMismatch { report });
                    }
                    match paths.as_slice() {
                        [single] => write_at(&current_step, single, returned)?,
                        many => {
                            let mut acc = current_step.clone();
                            for path in many {
                                let slice = read_at(&returned, path)
                                    .cloned()
                                    .ok_or_else(|| FormError::path_not_found(path.clone()))?;
                                acc = write_at(&acc, path, slice)?;
                            }
                            acc
                        }
                    }
                }
            };

            let mut new_doc = inner.current.clone();
            new_doc
                .as_object_mut()
                .ok_or_else(|| FormError::Invariant("document root is not an object".into()))?
                .insert(key_str, new_step);

            // Persist before committing so memory never runs ahead of storage.
            inner.storage.set(&new_doc)?;
            inner.current = new_doc;
            tracing::debug!(step = %key, op, "step state replaced");
            inner.current.clone()
        };

        self.observers.notify(&snapshot);
        Ok(())
    }
}

/// A handle bound to one step, exposing the step-scoped operation surface.
#[derive(Clone)]
pub struct StepHandle {
    schema: StepSchema,
    step: u32,
}

impl StepHandle {
    /// The bound step number.
    pub fn number(&self) -> u32 {
        self.step
    }

    /// The step's current data.
    pub fn get(&self) -> FormResult<StepView> {
        self.schema.get(self.step)
    }

    /// The step's current runtime fields object.
    pub fn value(&self) -> FormResult<Value> {
        let view = self.schema.get(self.step)?;
        view.data
            .get("fields")
            .cloned()
            .ok_or_else(|| FormError::Invariant(format!("step{} has no fields object", self.step)))
    }

    /// Update this step (see [`StepSchema::update`]).
    pub fn update(
        &self,
        fields: FieldSelection,
        updater: impl FnOnce(&UpdateCtx) -> Value,
    ) -> FormResult<()> {
        self.schema
            .update(UpdateOptions::step(self.step).fields(fields), updater)
    }

    /// Reset this step (see [`StepSchema::reset`]).
    pub fn reset(&self, fields: FieldSelection) -> FormResult<()> {
        self.schema.reset(self.step, fields)
    }

    /// Build a helper function bound to this step only.
    pub fn create_helper_fn<R>(
        &self,
        f: impl Fn(&HelperCtx) -> FormResult<R> + Send + Sync + 'static,
    ) -> FormResult<Helper<R>> {
        self.schema.create_helper_fn(
            StepSelection::keys([StepKey::new(self.step).to_string()]),
            f,
        )
    }
}

/// The context passed to a helper function: the chosen steps' current data
/// plus the sanctioned write path.
pub struct HelperCtx {
    ctx: Value,
    scope: UpdateScope,
}

impl HelperCtx {
    /// Map from step key to that step's current data.
    pub fn ctx(&self) -> &Value {
        &self.ctx
    }

    /// The current data of a step in this context.
    pub fn step_data(&self, step: u32) -> Option<&Value> {
        self.ctx.get(StepKey::new(step).to_string())
    }

    /// The scoped update dispatcher.
    pub fn scope(&self) -> &UpdateScope {
        &self.scope
    }
}

/// Write access restricted to the steps a helper was created over.
///
/// This is the only sanctioned write path from inside a helper; the data in
/// [`HelperCtx::ctx`] is a plain snapshot.
#[derive(Clone)]
pub struct UpdateScope {
    schema: StepSchema,
    allowed: Vec<StepKey>,
}

impl UpdateScope {
    /// The step keys this scope may write.
    pub fn allowed_steps(&self) -> Vec<String> {
        self.allowed.iter().map(ToString::to_string).collect()
    }

    /// Dispatch an update, rejecting steps outside the scope.
    pub fn update(
        &self,
        options: UpdateOptions,
        updater: impl FnOnce(&UpdateCtx) -> Value,
    ) -> FormResult<()> {
        if !self.allowed.iter().any(|k| k.number() == options.step) {
            return Err(FormError::invalid_keys(
                vec![StepKey::new(options.step).to_string()],
                self.allowed_steps(),
            ));
        }
        self.schema.update(options, updater)
    }
}

/// A reusable helper function bound to a step selection.
///
/// Each call re-resolves the context from the live document. Cloning shares
/// the underlying function.
pub struct Helper<R> {
    schema: StepSchema,
    steps: Vec<StepKey>,
    f: Arc<dyn Fn(&HelperCtx) -> FormResult<R> + Send + Sync>,
}

impl<R> Clone for Helper<R> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            steps: self.steps.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

impl<R> std::fmt::Debug for Helper<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Helper")
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl<R> Helper<R> {
    /// Invoke the helper against the current live state.
    pub fn call(&self) -> FormResult<R> {
        let ctx = self.schema.helper_ctx(&self.steps)?;
        (self.f)(&ctx)
    }
}

/// A helper function that validates its input before running.
pub struct ValidatedHelper<R> {
    schema: StepSchema,
    steps: Vec<StepKey>,
    validator: Validator,
    f: Arc<dyn Fn(&HelperCtx, &Value) -> FormResult<R> + Send + Sync>,
}

impl<R> Clone for ValidatedHelper<R> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            steps: self.steps.clone(),
            validator: self.validator.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

impl<R> ValidatedHelper<R> {
    /// Validate `data`, then invoke the helper against the current live
    /// state with the validated value.
    pub fn call(&self, data: &Value) -> FormResult<R> {
        let validated = self.validator.run(data)?;
        let ctx = self.schema.helper_ctx(&self.steps)?;
        (self.f)(&ctx, &validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn schema() -> StepSchema {
        StepSchema::builder()
            .step(
                "step1",
                StepConfig::new("Step 1")
                    .field("firstName", FieldConfig::new(""))
                    .field("age", FieldConfig::new(0)),
            )
            .step(
                "step2",
                StepConfig::new("Step 2").field("lastName", FieldConfig::new("")),
            )
            .store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_without_store_fails() {
        let err = StepSchema::builder()
            .step(
                "step1",
                StepConfig::new("S").field("a", FieldConfig::new(0)),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, FormError::NoStore));
    }

    #[test]
    fn test_classify_flags_false_is_error() {
        let value = json!({"a": 1});
        let mut flags = BTreeMap::new();
        flags.insert("a".to_owned(), false);
        let err = classify_selection(&value, &FieldSelection::Flags(flags)).unwrap_err();
        assert!(matches!(err, FormError::InvalidSelection { .. }));
    }

    #[test]
    fn test_classify_empty_paths_is_error() {
        let value = json!({"a": 1});
        let err = classify_selection(&value, &FieldSelection::Paths(vec![])).unwrap_err();
        assert!(matches!(err, FormError::EmptySelection));
    }

    #[test]
    fn test_classify_missing_path_is_error() {
        let value = json!({"a": 1});
        let err =
            classify_selection(&value, &FieldSelection::paths(["nope.deep"])).unwrap_err();
        assert!(matches!(err, FormError::PathNotFound { .. }));
    }

    #[test]
    fn test_classify_normalizes_ancestors() {
        let value = json!({"fields": {"a": {"defaultValue": 1}}});
        let plan = classify_selection(
            &value,
            &FieldSelection::paths(["fields.a.defaultValue", "fields.a"]),
        )
        .unwrap();
        match plan {
            Plan::Slices(paths) => {
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].to_string(), "fields.a");
            }
            Plan::Whole => panic!("expected slices"),
        }
    }

    #[test]
    fn test_update_unknown_step() {
        let s = schema();
        let err = s
            .update(UpdateOptions::step(9), |_| json!({}))
            .unwrap_err();
        match err {
            FormError::UnknownStep { step, known } => {
                assert_eq!(step, 9);
                assert_eq!(known.0, vec!["step1", "step2"]);
            }
            other => panic!("expected UnknownStep, got {other:?}"),
        }
    }

    #[test]
    fn test_ctx_data_merges_other_steps() {
        let s = schema();
        s.update(
            UpdateOptions::step(1)
                .paths(["fields.firstName.defaultValue"])
                .ctx_data(|others| {
                    let mut extra = Map::new();
                    extra.insert(
                        "otherTitle".to_owned(),
                        others["step2"]["title"].clone(),
                    );
                    // The target step is not part of the others snapshot.
                    assert!(others.get("step1").is_none());
                    extra
                }),
            |ctx| {
                assert_eq!(ctx.get("otherTitle"), Some(&json!("Step 2")));
                assert!(ctx.step_data(1).is_some());
                json!("from-ctx")
            },
        )
        .unwrap();
        assert_eq!(
            s.get(1).unwrap().data["fields"]["firstName"]["defaultValue"],
            "from-ctx"
        );
    }

    #[test]
    fn test_multi_path_update_writes_each_slice() {
        let s = schema();
        s.update(
            UpdateOptions::step(1).paths([
                "fields.firstName.defaultValue",
                "fields.age.defaultValue",
            ]),
            |_| {
                json!({
                    "fields": {
                        "firstName": {"defaultValue": "Ada"},
                        "age": {"defaultValue": 36},
                    }
                })
            },
        )
        .unwrap();
        let data = s.get(1).unwrap().data;
        assert_eq!(data["fields"]["firstName"]["defaultValue"], "Ada");
        assert_eq!(data["fields"]["age"]["defaultValue"], 36);
        // Untouched metadata survives.
        assert_eq!(data["fields"]["firstName"]["label"], "First Name");
    }

    #[test]
    fn test_scope_rejects_foreign_step() {
        let s = schema();
        let helper = s
            .create_helper_fn(StepSelection::keys(["step1"]), |ctx| {
                ctx.scope()
                    .update(UpdateOptions::step(2), |_| json!({}))
            })
            .unwrap();
        let err = helper.call().unwrap_err();
        match err {
            FormError::InvalidKeys { invalid, valid, .. } => {
                assert_eq!(invalid.0, vec!["step2"]);
                assert_eq!(valid.0, vec!["step1"]);
            }
            other => panic!("expected InvalidKeys, got {other:?}"),
        }
    }

    #[test]
    fn test_scope_allows_in_scope_update() {
        let s = schema();
        let helper = s
            .create_helper_fn(StepSelection::keys(["step1"]), |ctx| {
                ctx.scope().update(
                    UpdateOptions::step(1).paths(["fields.age.defaultValue"]),
                    |_| json!(21),
                )
            })
            .unwrap();
        helper.call().unwrap();
        assert_eq!(
            s.get(1).unwrap().data["fields"]["age"]["defaultValue"],
            21
        );
    }

    #[test]
    fn test_step_handle_surface() {
        let s = schema();
        let handle = s.step(2).unwrap();
        assert_eq!(handle.number(), 2);
        let fields = handle.value().unwrap();
        assert!(fields.get("lastName").is_some());

        handle
            .update(
                FieldSelection::paths(["fields.lastName.defaultValue"]),
                |_| json!("Lovelace"),
            )
            .unwrap();
        assert_eq!(
            handle.get().unwrap().data["fields"]["lastName"]["defaultValue"],
            "Lovelace"
        );
    }

    #[test]
    fn test_step_selection_flags_false_is_error() {
        let s = schema();
        let mut flags = BTreeMap::new();
        flags.insert("step1".to_owned(), false);
        let err = s
            .create_helper_fn(StepSelection::Flags(flags), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidSelection { .. }));
    }

    #[test]
    fn test_step_selection_empty_is_error() {
        let s = schema();
        let err = s
            .create_helper_fn(StepSelection::Keys(vec![]), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, FormError::EmptySelection));
    }
}
