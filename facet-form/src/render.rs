use core::fmt::Write as _;

use indexmap::IndexMap;

use crate::{Binding, Value, ValueReference, Widget, WidgetKind};

/// Hints for the form element
#[derive(Clone, Debug)]
pub struct FormHints<'a> {
    /// CSS class, absent when validation is off
    pub class: Option<&'a str>,
    /// Extra attributes
    pub attributes: &'a IndexMap<String, String>,
}

/// Hints for a row container
#[derive(Clone, Debug)]
pub struct RowHints {
    /// Row id; 0 for a field with a row of its own
    pub key: u32,
    /// CSS class
    pub class: String,
}

/// Hints for a labelled field group
#[derive(Clone, Debug)]
pub struct FieldHints<'a> {
    /// CSS class of the group
    pub group_class: String,
    /// Label text
    pub label: &'a str,
    /// Id of the input the label is for
    pub label_for: &'a str,
    /// CSS class of the label
    pub label_class: &'a str,
    /// CSS class of the wrapper around the widget
    pub wrapper_class: &'a str,
}

/// Everything a renderer needs to draw one widget
#[derive(Debug)]
pub struct InputSlot<'a> {
    /// Id of the input, shared with its label
    pub id: &'a str,
    /// Which widget, configured how
    pub widget: Widget,
    /// CSS class of the widget
    pub class: &'a str,
    /// Attributes forwarded verbatim
    pub attributes: &'a IndexMap<String, String>,
    /// Accessor to the model
    pub binding: Binding,
    /// Where to show validation messages; absent when validation is off
    pub validation: Option<ValueReference>,
}

/// Produces the visual tree for a form.
///
/// [`Form::render`](crate::Form::render) drives a renderer through a strictly
/// nested sequence of calls; every `open_*` is matched by its `close_*`.
pub trait Renderer {
    /// Opens the form element (not called in table-row mode)
    fn open_form(&mut self, hints: &FormHints<'_>);
    /// Closes the form element
    fn close_form(&mut self);
    /// Slot for the validation summary
    fn validation_summary(&mut self);
    /// The hidden submit button
    fn submit_button(&mut self);
    /// Opens a row container
    fn open_row(&mut self, hints: &RowHints);
    /// Closes a row container
    fn close_row(&mut self);
    /// Opens a table cell (table-row mode only)
    fn open_cell(&mut self, style: Option<&str>);
    /// Closes a table cell
    fn close_cell(&mut self);
    /// Opens a labelled field group
    fn open_field(&mut self, hints: &FieldHints<'_>);
    /// Closes a field group
    fn close_field(&mut self);
    /// Draws one widget
    fn input(&mut self, slot: InputSlot<'_>);
}

impl Renderer for () {
    fn open_form(&mut self, _hints: &FormHints<'_>) {}
    fn close_form(&mut self) {}
    fn validation_summary(&mut self) {}
    fn submit_button(&mut self) {}
    fn open_row(&mut self, _hints: &RowHints) {}
    fn close_row(&mut self) {}
    fn open_cell(&mut self, _style: Option<&str>) {}
    fn close_cell(&mut self) {}
    fn open_field(&mut self, _hints: &FieldHints<'_>) {}
    fn close_field(&mut self) {}
    fn input(&mut self, _slot: InputSlot<'_>) {}
}

/// A [`Renderer`] that writes an indented plain-text outline and keeps the
/// bindings it was handed, so they can be driven afterwards.
#[derive(Debug, Default)]
pub struct Outline {
    out: String,
    depth: usize,
    bindings: Vec<Binding>,
}

impl Outline {
    /// An empty outline
    pub fn new() -> Self {
        Self::default()
    }

    /// The outline so far
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Binding of the field called `name`, from the last input drawn for it
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().rev().find(|b| b.name() == name)
    }

    /// Every binding, in drawing order
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Writes a free-form line at the current depth, for templates
    pub fn text(&mut self, text: &str) {
        self.line(text);
    }

    /// Forgets everything drawn so far
    pub fn clear(&mut self) {
        self.out.clear();
        self.depth = 0;
        self.bindings.clear();
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

impl Renderer for Outline {
    fn open_form(&mut self, hints: &FormHints<'_>) {
        let mut text = String::from("form");
        if let Some(class) = hints.class {
            let _ = write!(text, " class={class:?}");
        }
        for (name, value) in hints.attributes {
            let _ = write!(text, " {name}={value:?}");
        }
        self.open(&text);
    }

    fn close_form(&mut self) {
        self.close();
    }

    fn validation_summary(&mut self) {
        self.line("validation-summary");
    }

    fn submit_button(&mut self) {
        self.line("submit");
    }

    fn open_row(&mut self, hints: &RowHints) {
        self.open(&format!("row {} class={:?}", hints.key, hints.class));
    }

    fn close_row(&mut self) {
        self.close();
    }

    fn open_cell(&mut self, style: Option<&str>) {
        match style {
            Some(style) => self.open(&format!("cell style={style:?}")),
            None => self.open("cell"),
        }
    }

    fn close_cell(&mut self) {
        self.close();
    }

    fn open_field(&mut self, hints: &FieldHints<'_>) {
        self.open(&format!(
            "field {:?} class={:?} for={:?}",
            hints.label, hints.group_class, hints.label_for
        ));
    }

    fn close_field(&mut self) {
        self.close();
    }

    fn input(&mut self, slot: InputSlot<'_>) {
        let widget = &slot.widget;
        let mut text = format!("{:?}", widget.kind);
        if widget.kind == WidgetKind::Fallback {
            let _ = write!(text, " {:?}", slot.binding.value().to_string());
        } else {
            let value = match slot.binding.value() {
                Value::Null => String::from("null"),
                value => format!("{value:?}"),
            };
            let _ = write!(text, " = {value}");
        }
        for option in &widget.options.choices {
            let _ = write!(text, " [{}]", option.label);
        }
        if let Some(null_label) = widget.options.null_label {
            let _ = write!(text, " [{null_label:?}]");
        }
        if widget.options.masked {
            text.push_str(" masked");
        }
        if widget.disabled {
            text.push_str(" disabled");
        }
        for (name, value) in slot.attributes {
            let _ = write!(text, " {name}={value:?}");
        }
        if let Some(reference) = &slot.validation {
            let _ = write!(text, " validates {reference}");
        }
        self.line(&text);
        self.bindings.push(slot.binding);
    }
}
