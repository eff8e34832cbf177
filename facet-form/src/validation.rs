use indexmap::IndexMap;

use crate::ValueReference;

/// Decides whether a model is acceptable. The rules themselves live outside
/// this crate; this is the seam they plug into.
///
/// Implemented for any `Fn(&M, &mut ValidationContext) -> bool`.
pub trait Validator<M> {
    /// Validates `model`, recording per-field messages in `context`
    fn validate(&self, model: &M, context: &mut ValidationContext) -> bool;
}

impl<M, F> Validator<M> for F
where
    F: Fn(&M, &mut ValidationContext) -> bool,
{
    fn validate(&self, model: &M, context: &mut ValidationContext) -> bool {
        self(model, context)
    }
}

/// The references of every bound field, and the messages a validator left
/// for them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationContext {
    references: Vec<ValueReference>,
    messages: IndexMap<ValueReference, Vec<String>>,
}

impl ValidationContext {
    /// A context over `references`
    pub fn new(references: Vec<ValueReference>) -> Self {
        Self {
            references,
            messages: IndexMap::new(),
        }
    }

    /// Every bound field
    pub fn references(&self) -> &[ValueReference] {
        &self.references
    }

    /// The reference of the field called `name`
    pub fn reference(&self, name: &str) -> Option<&ValueReference> {
        self.references.iter().find(|r| r.name() == name)
    }

    /// Records `message` against `reference`
    pub fn add_message(&mut self, reference: ValueReference, message: impl Into<String>) {
        self.messages
            .entry(reference)
            .or_default()
            .push(message.into());
    }

    /// Records `message` against the field called `name`; returns `false` if
    /// no such field is bound
    pub fn add_message_for(&mut self, name: &str, message: impl Into<String>) -> bool {
        match self.reference(name).cloned() {
            Some(reference) => {
                self.add_message(reference, message);
                true
            }
            None => false,
        }
    }

    /// Messages recorded against `reference`
    pub fn messages_for(&self, reference: &ValueReference) -> &[String] {
        self.messages
            .get(reference)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every reference that has messages, with its messages
    pub fn messages(&self) -> impl Iterator<Item = (&ValueReference, &[String])> {
        self.messages.iter().map(|(r, m)| (r, m.as_slice()))
    }

    /// Whether no messages were recorded
    pub fn is_clean(&self) -> bool {
        self.messages.is_empty()
    }
}
