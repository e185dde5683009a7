use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use super::controller::{FieldKey, FormController, FormId, FormState, SubmitState, write_lock};
use super::validation::{FieldError, FormModel};

pub type BoxedSubmitFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'static>>;

/// Recorded in `submit_error` when a submit ends without the handler
/// returning.
pub const SUBMIT_INTERRUPTED: &str = "Submission was interrupted";

pub(super) type SubmitHandlerFn<T> = Arc<dyn Fn(T) -> BoxedSubmitFuture + Send + Sync>;

/// The view-side event that triggered a submit, e.g. a native form submission
/// whose default behaviour must be suppressed.
pub trait SubmitEvent {
    fn prevent_default(&mut self);
}

impl<T> FormController<T>
where
    T: FormModel,
{
    /// Installs a synchronous submit handler. Call before sharing the handle:
    /// clones made earlier keep the previous handler.
    pub fn with_submit_handler<F, E>(mut self, handler: F) -> Self
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: Display + 'static,
    {
        let handler = Arc::new(handler);
        self.submit_handler = Some(Arc::new(move |model: T| -> BoxedSubmitFuture {
            let result = handler(&model).map_err(|error| error.to_string());
            Box::pin(std::future::ready(result))
        }));
        self
    }

    pub fn with_async_submit_handler<F, Fut, E>(mut self, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + 'static,
    {
        let handler = Arc::new(handler);
        self.submit_handler = Some(Arc::new(move |model: T| -> BoxedSubmitFuture {
            let submitted = handler(model);
            Box::pin(async move { submitted.await.map_err(|error| error.to_string()) })
        }));
        self
    }

    pub fn has_submit_handler(&self) -> bool {
        self.submit_handler.is_some()
    }

    /// Validates every field and, if the form is valid, runs the submit handler
    /// with a snapshot of the values.
    ///
    /// Handler failures are logged and kept in [`submit_error`]; they never
    /// reach the caller or the field errors. Nothing stops a second submit
    /// while one is in flight, so views should disable their submit control
    /// while [`is_submitting`] is true. The form leaves `Submitting` even when
    /// the returned future is dropped early or the handler panics.
    ///
    /// [`submit_error`]: FormController::submit_error
    /// [`is_submitting`]: FormController::is_submitting
    pub async fn handle_submit(&self) {
        self.handle_submit_with_checks(|_: &T| None::<(FieldKey, String)>).await;
    }

    /// [`handle_submit`] with extra form-level checks that span several
    /// fields. `checks` runs after the field rules; each reported
    /// `(field, message)` is shown on that field unless a rule already put an
    /// error there, and blocks the submit.
    ///
    /// [`handle_submit`]: FormController::handle_submit
    pub async fn handle_submit_with_checks<C, I>(&self, checks: C)
    where
        C: FnOnce(&T) -> I,
        I: IntoIterator<Item = (FieldKey, String)>,
    {
        let Some((in_flight, model)) = self.begin_submit(checks) else {
            return;
        };

        tracing::debug!(form = %in_flight.form_id, "submitting");
        let result = match &self.submit_handler {
            Some(handler) => handler(model).await,
            None => Ok(()),
        };
        in_flight.finish(result);
    }

    fn begin_submit<C, I>(&self, checks: C) -> Option<(InFlightSubmit<T>, T)>
    where
        C: FnOnce(&T) -> I,
        I: IntoIterator<Item = (FieldKey, String)>,
    {
        let mut state = write_lock(&self.state);
        state.submit_count = state.submit_count.saturating_add(1);
        let mut valid = self.validate_keys_locked(&mut state, T::field_keys());
        for (key, message) in checks(&state.model) {
            if let Some(meta) = state.meta_mut(key)
                && meta.error.is_none()
            {
                meta.error = Some(FieldError::Manual(message));
                meta.touched = true;
            }
            valid = false;
        }
        if !valid {
            if state.submit_state != SubmitState::Submitting {
                state.submit_state = SubmitState::Invalid;
            }
            tracing::debug!(form = %state.id, "submit blocked by validation errors");
            return None;
        }

        state.submit_state = SubmitState::Submitting;
        state.submit_error = None;
        let in_flight = InFlightSubmit {
            state: self.state.clone(),
            form_id: state.id,
            generation: state.generation,
            armed: true,
        };
        Some((in_flight, state.model.clone()))
    }

    pub async fn handle_submit_event<E>(&self, event: &mut E)
    where
        E: SubmitEvent + ?Sized,
    {
        event.prevent_default();
        self.handle_submit().await;
    }
}

/// Moves the form out of `Submitting` when dropped before [`finish`] ran,
/// which happens when the submit future is dropped or the handler panics.
///
/// [`finish`]: InFlightSubmit::finish
struct InFlightSubmit<T> {
    state: Arc<RwLock<FormState<T>>>,
    form_id: FormId,
    generation: u64,
    armed: bool,
}

impl<T> InFlightSubmit<T> {
    fn finish(mut self, result: Result<(), String>) {
        self.armed = false;
        let mut state = write_lock(&self.state);
        if state.generation != self.generation {
            tracing::debug!(form = %self.form_id, "form reset during submit, outcome dropped");
            return;
        }
        match result {
            Ok(()) => {
                state.submit_state = SubmitState::Succeeded;
                tracing::debug!(form = %self.form_id, "submit succeeded");
            }
            Err(error) => {
                tracing::warn!(form = %self.form_id, %error, "submit handler failed");
                state.submit_state = SubmitState::Failed;
                state.submit_error = Some(error);
            }
        }
    }
}

impl<T> Drop for InFlightSubmit<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = write_lock(&self.state);
        if state.generation == self.generation
            && state.submit_state == SubmitState::Submitting
        {
            tracing::warn!(form = %self.form_id, "submit abandoned before the handler returned");
            state.submit_state = SubmitState::Failed;
            state.submit_error = Some(SUBMIT_INTERRUPTED.to_string());
        }
    }
}
