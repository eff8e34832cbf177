use alloc::rc::Weak;
use core::fmt;

use uuid::Uuid;

use crate::{FormError, SubmitOutcome};

/// Identity of a form, unique per instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(Uuid);

impl FormId {
    /// A fresh random id
    pub fn new() -> Self {
        FormId(Uuid::new_v4())
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coordinates submission across several forms.
///
/// A form given a container at construction registers with it right away and
/// unregisters when dropped.
pub trait FormContainer {
    /// Called once by each form built with this container
    fn register_form(&self, form: Weak<dyn ContainerMember>);

    /// Called when a registered form is dropped
    fn unregister_form(&self, id: FormId);

    /// Called by a member form that wants the container to submit
    fn notify_submit(&self) -> Result<(), FormError>;
}

/// The side of a form a container sees.
pub trait ContainerMember {
    /// Id of the form
    fn form_id(&self) -> FormId;

    /// Runs the form's submit pipeline. A validation failure is an
    /// [`FormError::Validation`] error, so the container can aggregate it.
    fn submit_from_container(&self, user_interacted: bool) -> Result<SubmitOutcome, FormError>;

    /// Whether the form has changes that weren't submitted yet
    fn has_unsaved_changes(&self) -> bool;
}
