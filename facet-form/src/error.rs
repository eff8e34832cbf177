use owo_colors::OwoColorize;

use crate::ValueError;

/// Message carried by [`FormError::Validation`]
pub const VALIDATION_MESSAGE: &str =
    "Please check the values. There is at least one validation error!";

/// Errors a form can raise while rendering, binding or submitting.
#[derive(Debug)]
#[non_exhaustive]
pub enum FormError {
    /// A field has neither a resolvable property type nor a declared one
    UnresolvedType {
        /// name of the field
        field: String,
    },

    /// An explicit field names a property the model doesn't have
    UnknownProperty {
        /// type identifier of the model
        model: String,
        /// name of the field
        field: String,
    },

    /// A value could not be written into its property
    Value(ValueError),

    /// A write was attempted through a read-only binding
    ReadOnly {
        /// name of the field
        field: String,
    },

    /// A submit inside a container failed validation
    Validation {
        /// user-facing message
        message: String,
    },

    /// The valid-submit handler failed
    Handler(Box<dyn core::error::Error + Send + Sync + 'static>),

    /// The model is already borrowed, e.g. a binding was written from inside
    /// a submit handler
    ModelBusy,

    /// The form behind a binding no longer exists
    FormDropped,
}

impl FormError {
    /// The error raised when a container submit fails validation
    pub fn validation() -> Self {
        FormError::Validation {
            message: VALIDATION_MESSAGE.into(),
        }
    }
}

impl core::fmt::Display for FormError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FormError::UnresolvedType { field } => write!(
                f,
                "could not determine type for field `{}`; declare it explicitly",
                field.yellow()
            ),
            FormError::UnknownProperty { model, field } => write!(
                f,
                "{} has no property named `{}`",
                model.blue(),
                field.red()
            ),
            FormError::Value(err) => write!(f, "{err}"),
            FormError::ReadOnly { field } => {
                write!(f, "Field `{}` is read-only", field.yellow())
            }
            FormError::Validation { message } => write!(f, "{}", message.red()),
            FormError::Handler(err) => write!(f, "Submit handler failed: {err}"),
            FormError::ModelBusy => write!(f, "Model is already borrowed"),
            FormError::FormDropped => write!(f, "Form was dropped"),
        }
    }
}

impl core::error::Error for FormError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            FormError::Value(err) => Some(err),
            FormError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ValueError> for FormError {
    fn from(err: ValueError) -> Self {
        FormError::Value(err)
    }
}
