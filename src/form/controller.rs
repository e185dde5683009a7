use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::submit::SubmitHandlerFn;
use super::validation::{FieldError, FieldLens, FieldValidatorFn, FormModel, FormRules};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Outcome of the latest submit attempt.
///
/// `Submitting` is the only state in which the form reports itself as
/// submitting. Overlapping submits are not serialised: whichever finishes
/// first moves the form out of `Submitting`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Submitting,
    Succeeded,
    Invalid,
    Failed,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldMeta {
    pub dirty: bool,
    pub touched: bool,
    pub error: Option<FieldError>,
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T> {
    pub model: T,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub submit_error: Option<String>,
    pub is_submitting: bool,
    pub is_dirty: bool,
    pub is_valid: bool,
    pub field_meta: BTreeMap<FieldKey, FieldMeta>,
}

impl<T> FormSnapshot<T> {
    pub fn has_errors(&self) -> bool {
        !self.is_valid
    }

    pub fn errors(&self) -> BTreeMap<FieldKey, Option<FieldError>> {
        self.field_meta
            .iter()
            .map(|(key, meta)| (*key, meta.error.clone()))
            .collect()
    }

    pub fn touched(&self) -> BTreeMap<FieldKey, bool> {
        self.field_meta
            .iter()
            .map(|(key, meta)| (*key, meta.touched))
            .collect()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("form has no field named `{0}`")]
    UnknownField(String),
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) struct FormState<T> {
    pub(super) id: FormId,
    pub(super) initial_model: T,
    pub(super) model: T,
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) submit_error: Option<String>,
    pub(super) field_meta: BTreeMap<FieldKey, FieldMeta>,
    /// Bumped by `reset`; a submit started in an earlier generation must not
    /// write its outcome.
    pub(super) generation: u64,
}

impl<T> FormState<T>
where
    T: FormModel,
{
    fn pristine(id: FormId, initial: T) -> Self {
        Self {
            id,
            initial_model: initial.clone(),
            model: initial,
            submit_state: SubmitState::Idle,
            submit_count: 0,
            submit_error: None,
            field_meta: T::field_keys()
                .iter()
                .map(|key| (*key, FieldMeta::default()))
                .collect(),
            generation: 0,
        }
    }
}

/// Tracks the values, errors and touched flags of one form.
///
/// The handle is cheap to clone; clones share the same state. The field set is
/// fixed by `T::field_keys()` and rules are fixed at construction. Validation
/// rules run while the state lock is held and must not call back into the
/// controller.
#[derive(Clone)]
pub struct FormController<T>
where
    T: FormModel,
{
    pub(super) state: Arc<RwLock<FormState<T>>>,
    pub(super) validators: Arc<BTreeMap<FieldKey, FieldValidatorFn<T>>>,
    pub(super) required_fields: Arc<[FieldKey]>,
    pub(super) submit_handler: Option<SubmitHandlerFn<T>>,
}

impl<T> FormController<T>
where
    T: FormModel,
{
    pub fn new(initial: T, rules: FormRules<T>) -> Self {
        let id = FormId::next();
        let known = T::field_keys();
        for key in rules.validators.keys() {
            if !known.contains(key) {
                tracing::warn!(
                    form = %id,
                    field = %key,
                    "rule registered for a field outside the model"
                );
            }
        }
        tracing::debug!(form = %id, fields = known.len(), rules = rules.len(), "form created");

        Self {
            state: Arc::new(RwLock::new(FormState::pristine(id, initial))),
            validators: Arc::new(rules.validators),
            required_fields: rules.required.into(),
            submit_handler: None,
        }
    }

    pub fn form_id(&self) -> FormId {
        read_lock(&self.state).id
    }

    pub fn field_keys(&self) -> &'static [FieldKey] {
        T::field_keys()
    }

    /// Stores `value` and revalidates this field only.
    pub fn set_field_value<L>(&self, lens: L, value: L::Value)
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        let mut state = write_lock(&self.state);
        lens.set(&mut state.model, value);
        let dirty = lens.get(&state.model) != lens.get(&state.initial_model);
        let error = self.run_validator(key, &state.model);
        if let Some(meta) = state.meta_mut(key) {
            meta.dirty = dirty;
            meta.error = error;
        }
    }

    pub fn set_field_touched<L>(&self, lens: L, touched: bool)
    where
        L: FieldLens<T>,
    {
        if let Some(meta) = write_lock(&self.state).meta_mut(lens.key()) {
            meta.touched = touched;
        }
    }

    /// Overwrites the field's error without consulting its rules.
    pub fn set_field_error<L>(&self, lens: L, error: Option<String>)
    where
        L: FieldLens<T>,
    {
        if let Some(meta) = write_lock(&self.state).meta_mut(lens.key()) {
            meta.error = error.map(FieldError::Manual);
        }
    }

    /// Same as [`set_field_error`](Self::set_field_error) for errors that
    /// arrive keyed by field name, e.g. from a server response.
    pub fn set_field_error_by_name(&self, name: &str, error: Option<String>) -> FormResult<()> {
        let key = T::field_keys()
            .iter()
            .copied()
            .find(|key| key.as_str() == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        if let Some(meta) = write_lock(&self.state).meta_mut(key) {
            meta.error = error.map(FieldError::Manual);
        }
        Ok(())
    }

    /// Revalidates and touches every field. Returns `true` when no field has
    /// an error afterwards.
    pub fn validate_form(&self) -> bool {
        let mut state = write_lock(&self.state);
        self.validate_keys_locked(&mut state, T::field_keys())
    }

    pub fn validate_field<L>(&self, lens: L) -> bool
    where
        L: FieldLens<T>,
    {
        self.validate_fields(&[lens.key()])
    }

    /// Revalidates and touches only `keys`. Keys outside the model are ignored.
    pub fn validate_fields(&self, keys: &[FieldKey]) -> bool {
        let known = T::field_keys();
        let keys = keys
            .iter()
            .copied()
            .filter(|key| known.contains(key))
            .collect::<Vec<_>>();
        let mut state = write_lock(&self.state);
        self.validate_keys_locked(&mut state, &keys)
    }

    pub fn reset(&self) {
        let mut state = write_lock(&self.state);
        let id = state.id;
        let initial = state.initial_model.clone();
        let generation = state.generation.wrapping_add(1);
        *state = FormState::pristine(id, initial);
        state.generation = generation;
        tracing::debug!(form = %id, "form reset");
    }

    pub fn values(&self) -> T {
        read_lock(&self.state).model.clone()
    }

    pub fn value<L>(&self, lens: L) -> L::Value
    where
        L: FieldLens<T>,
    {
        lens.get(&read_lock(&self.state).model).clone()
    }

    pub fn errors(&self) -> BTreeMap<FieldKey, Option<FieldError>> {
        read_lock(&self.state)
            .field_meta
            .iter()
            .map(|(key, meta)| (*key, meta.error.clone()))
            .collect()
    }

    pub fn error<L>(&self, lens: L) -> Option<FieldError>
    where
        L: FieldLens<T>,
    {
        read_lock(&self.state)
            .field_meta
            .get(&lens.key())
            .and_then(|meta| meta.error.clone())
    }

    pub fn touched(&self) -> BTreeMap<FieldKey, bool> {
        read_lock(&self.state)
            .field_meta
            .iter()
            .map(|(key, meta)| (*key, meta.touched))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        read_lock(&self.state)
            .field_meta
            .values()
            .all(|meta| meta.error.is_none())
    }

    pub fn has_errors(&self) -> bool {
        !self.is_valid()
    }

    pub fn is_submitting(&self) -> bool {
        read_lock(&self.state).submit_state == SubmitState::Submitting
    }

    pub fn is_dirty(&self) -> bool {
        read_lock(&self.state)
            .field_meta
            .values()
            .any(|meta| meta.dirty)
    }

    pub fn submit_state(&self) -> SubmitState {
        read_lock(&self.state).submit_state
    }

    pub fn submit_count(&self) -> u32 {
        read_lock(&self.state).submit_count
    }

    /// Failure message of the latest submit handler run, if it failed.
    pub fn submit_error(&self) -> Option<String> {
        read_lock(&self.state).submit_error.clone()
    }

    pub fn field_meta<L>(&self, lens: L) -> Option<FieldMeta>
    where
        L: FieldLens<T>,
    {
        read_lock(&self.state).field_meta.get(&lens.key()).cloned()
    }

    pub fn is_required<L>(&self, lens: L) -> bool
    where
        L: FieldLens<T>,
    {
        self.required_fields.contains(&lens.key())
    }

    /// The field's error message, but only once the user has touched the field
    /// or tried to submit.
    pub fn visible_error<L>(&self, lens: L) -> Option<String>
    where
        L: FieldLens<T>,
    {
        let state = read_lock(&self.state);
        let meta = state.field_meta.get(&lens.key())?;
        if !meta.touched && state.submit_count == 0 {
            return None;
        }
        meta.error.as_ref().map(FieldError::message)
    }

    pub fn snapshot(&self) -> FormSnapshot<T> {
        let state = read_lock(&self.state);
        FormSnapshot {
            model: state.model.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            submit_error: state.submit_error.clone(),
            is_submitting: state.submit_state == SubmitState::Submitting,
            is_dirty: state.field_meta.values().any(|meta| meta.dirty),
            is_valid: state.field_meta.values().all(|meta| meta.error.is_none()),
            field_meta: state.field_meta.clone(),
        }
    }

    pub(super) fn validate_keys_locked(
        &self,
        state: &mut FormState<T>,
        keys: &[FieldKey],
    ) -> bool {
        for key in keys {
            let error = self.run_validator(*key, &state.model);
            if let Some(meta) = state.meta_mut(*key) {
                meta.touched = true;
                meta.error = error;
            }
        }
        let invalid = keys
            .iter()
            .filter(|key| {
                state
                    .field_meta
                    .get(*key)
                    .is_some_and(|meta| meta.error.is_some())
            })
            .count();
        tracing::debug!(form = %state.id, checked = keys.len(), invalid, "fields validated");
        invalid == 0
    }

    fn run_validator(&self, key: FieldKey, model: &T) -> Option<FieldError> {
        self.validators
            .get(&key)
            .and_then(|validator| validator(model))
    }
}

impl<T> FormState<T> {
    /// Metadata of a known field. The field set never grows after
    /// construction, so unknown keys yield `None`.
    pub(super) fn meta_mut(&mut self, key: FieldKey) -> Option<&mut FieldMeta> {
        let meta = self.field_meta.get_mut(&key);
        if meta.is_none() {
            tracing::warn!(form = %self.id, field = %key, "ignoring update for unknown field");
        }
        meta
    }
}

pub(super) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(super) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
