//! Create/edit dialog state machine:
//! `Closed -> Open -> Submitting -> Closed` on success, back to `Open` with
//! the error and the entered values on failure.

use std::future::Future;

use serde::Serialize;

use crate::error::{AdminError, ValidationErrors};
use crate::listing::ListViewModel;

/// Raw form input for one entity type. Fields hold what the operator typed;
/// `validate` turns them into the request payload or reports every problem.
pub trait FormSchema: Clone + Default {
    type Entity;
    type Payload: Serialize;

    /// Prefills the form from a cached entity.
    fn from_entity(entity: &Self::Entity) -> Self;

    fn validate(&self) -> Result<Self::Payload, ValidationErrors>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState<F> {
    Closed,
    Open {
        mode: DialogMode,
        form: F,
        error: Option<AdminError>,
    },
    Submitting {
        mode: DialogMode,
        form: F,
    },
}

#[derive(Debug, Clone)]
pub struct MutationDialog<F: FormSchema> {
    state: DialogState<F>,
}

impl<F: FormSchema> Default for MutationDialog<F> {
    fn default() -> Self {
        Self {
            state: DialogState::Closed,
        }
    }
}

impl<F: FormSchema> MutationDialog<F> {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn state(&self) -> &DialogState<F> {
        &self.state
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open { .. })
    }

    pub fn open_create(&mut self) {
        self.state = DialogState::Open {
            mode: DialogMode::Create,
            form: F::default(),
            error: None,
        };
    }

    /// Opens the dialog prefilled from the cached copy of the entity.
    pub fn open_edit(&mut self, id: impl Into<String>, entity: &F::Entity) {
        self.state = DialogState::Open {
            mode: DialogMode::Edit(id.into()),
            form: F::from_entity(entity),
            error: None,
        };
    }

    #[cfg(test)]
    pub fn form(&self) -> Option<&F> {
        match &self.state {
            DialogState::Open { form, .. } | DialogState::Submitting { form, .. } => Some(form),
            DialogState::Closed => None,
        }
    }

    /// Editable only while open.
    pub fn form_mut(&mut self) -> Option<&mut F> {
        match &mut self.state {
            DialogState::Open { form, .. } => Some(form),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&AdminError> {
        match &self.state {
            DialogState::Open { error, .. } => error.as_ref(),
            _ => None,
        }
    }

    /// Validates locally, then hands the payload to `send`. Validation
    /// failures never reach `send`.
    pub async fn submit<O, Fut, S>(&mut self, send: S) -> Result<O, AdminError>
    where
        S: FnOnce(DialogMode, F::Payload) -> Fut,
        Fut: Future<Output = Result<O, AdminError>>,
    {
        let (mode, form) = match std::mem::replace(&mut self.state, DialogState::Closed) {
            DialogState::Open { mode, form, .. } => (mode, form),
            other => {
                self.state = other;
                return Err(AdminError::Validation(ValidationErrors::single(
                    "dialog",
                    "dialog is not open",
                )));
            }
        };

        let payload = match form.validate() {
            Ok(payload) => payload,
            Err(errors) => {
                let err = AdminError::Validation(errors);
                self.state = DialogState::Open {
                    mode,
                    form,
                    error: Some(err.clone()),
                };
                return Err(err);
            }
        };

        self.state = DialogState::Submitting {
            mode: mode.clone(),
            form,
        };

        let result = send(mode, payload).await;

        match (result, std::mem::replace(&mut self.state, DialogState::Closed)) {
            (Ok(output), _) => Ok(output),
            (Err(err), DialogState::Submitting { mode, form }) => {
                tracing::warn!(error = %err, "mutation failed, dialog stays open");
                self.state = DialogState::Open {
                    mode,
                    form,
                    error: Some(err.clone()),
                };
                Err(err)
            }
            (Err(err), _) => Err(err),
        }
    }

    /// `submit`, then re-fetch the owning list. A failed re-fetch does not
    /// undo the mutation; it shows up as the list's error state.
    pub async fn submit_and_refresh<T, O, Fut, S>(
        &mut self,
        list: &ListViewModel<T>,
        send: S,
    ) -> Result<O, AdminError>
    where
        T: Clone + Send + Sync + 'static,
        S: FnOnce(DialogMode, F::Payload) -> Fut,
        Fut: Future<Output = Result<O, AdminError>>,
    {
        let output = self.submit(send).await?;
        if let Err(err) = list.refresh().await {
            tracing::warn!(error = %err, "refresh after mutation failed");
        }
        Ok(output)
    }
}

/// Runs a mutation that has no form (delete, status change) and refreshes
/// the list on success. On failure the cache is left untouched.
pub async fn mutate_and_refresh<T, O, Fut>(list: &ListViewModel<T>, action: Fut) -> Result<O, AdminError>
where
    T: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<O, AdminError>>,
{
    let output = action.await?;
    if let Err(err) = list.refresh().await {
        tracing::warn!(error = %err, "refresh after mutation failed");
    }
    Ok(output)
}
