use bitflags::bitflags;
use log::debug;

use crate::{Attributes, Def, NumberAffinity, Shape, TemporalKind, Value};

/// Label of the "unset" option of nullable choices in a filter row: a
/// zero-width space, so the option exists but shows nothing.
pub const NULL_PLACEHOLDER: &str = "\u{200b}";

bitflags! {
    /// Context a widget is selected in
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DispatchFlags: u8 {
        /// The form is a filter row of a table
        const FILTER_ROW = 1 << 0;

        /// Every widget is disabled
        const READ_ONLY = 1 << 1;
    }
}

/// Which widget edits a field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum WidgetKind {
    /// Numeric input
    Number,
    /// Date picker
    Date,
    /// Date and time-of-day picker
    DateTime,
    /// Time-of-day picker
    Time,
    /// Checkbox for a non-nullable boolean
    Checkbox,
    /// true / false / unset choice for a nullable boolean
    TriState,
    /// Identifier input
    Identifier,
    /// One of a closed set of variants
    Choice,
    /// Single-line text
    Text,
    /// Multi-line text
    TextArea,
    /// Disabled display of the current value, for types no widget edits
    Fallback,
}

/// One selectable option of a [`WidgetKind::Choice`] or [`WidgetKind::TriState`]
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceOption {
    /// What the user sees
    pub label: String,
    /// What is written to the model
    pub value: Value,
}

/// Widget-specific configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WidgetOptions {
    /// Number family, for numeric inputs
    pub number: Option<NumberAffinity>,

    /// Render the input masked
    pub masked: bool,

    /// `Null` is a legal value
    pub nullable: bool,

    /// Options of choice-like widgets, in declaration order
    pub choices: Vec<ChoiceOption>,

    /// Label of the explicit "unset" option, if the widget offers one
    pub null_label: Option<&'static str>,
}

/// A selected widget: kind, options and the disabled flag.
#[derive(Clone, Debug, PartialEq)]
pub struct Widget {
    /// Which widget
    pub kind: WidgetKind,
    /// How to configure it
    pub options: WidgetOptions,
    /// Whether the user can edit it
    pub disabled: bool,
}

impl Widget {
    /// The disabled read-only display used for unsupported types
    pub fn fallback() -> Self {
        Widget {
            kind: WidgetKind::Fallback,
            options: WidgetOptions::default(),
            disabled: true,
        }
    }

    /// Whether this is the fallback display
    pub fn is_fallback(&self) -> bool {
        self.kind == WidgetKind::Fallback
    }

    /// Number of states the user can pick from, for choice-like widgets
    pub fn state_count(&self) -> usize {
        self.options.choices.len() + usize::from(self.options.null_label.is_some())
    }
}

/// Picks the widget for a field of type `shape`.
///
/// Total over every [`Shape`]: types no widget can edit get
/// [`Widget::fallback`].
pub fn select_widget(shape: &'static Shape, attributes: &Attributes, flags: DispatchFlags) -> Widget {
    let nullable = shape.is_nullable();
    let inner = shape.unwrapped();
    let filter = flags.contains(DispatchFlags::FILTER_ROW);

    let mut options = WidgetOptions {
        nullable,
        ..WidgetOptions::default()
    };

    let kind = match inner.def {
        Def::Number(affinity) => {
            options.number = Some(affinity);
            WidgetKind::Number
        }
        Def::Temporal(kind) => {
            if attributes.wants_time() {
                WidgetKind::Time
            } else if attributes.wants_date_time() {
                WidgetKind::DateTime
            } else if kind == TemporalKind::Time {
                // a date picker can't edit a time of day
                WidgetKind::Time
            } else {
                WidgetKind::Date
            }
        }
        Def::Bool if nullable => {
            options.choices = [true, false]
                .into_iter()
                .map(|b| ChoiceOption {
                    label: b.to_string(),
                    value: Value::Bool(b),
                })
                .collect();
            if filter {
                options.null_label = Some(NULL_PLACEHOLDER);
            }
            WidgetKind::TriState
        }
        Def::Bool => WidgetKind::Checkbox,
        Def::Identifier => WidgetKind::Identifier,
        Def::Choice(choice) => {
            options.choices = choice
                .variants
                .iter()
                .map(|variant| ChoiceOption {
                    label: (*variant).to_string(),
                    value: Value::Choice((*variant).to_string()),
                })
                .collect();
            if filter && nullable {
                options.null_label = Some(NULL_PLACEHOLDER);
            }
            WidgetKind::Choice
        }
        Def::Text if attributes.is_multiline() => WidgetKind::TextArea,
        Def::Text => WidgetKind::Text,
        Def::Option(_) | Def::Opaque => {
            debug!("No widget for {shape}, using the fallback display");
            return Widget::fallback();
        }
    };

    options.masked = attributes.is_password();

    Widget {
        kind,
        options,
        disabled: flags.contains(DispatchFlags::READ_ONLY) || attributes.is_read_only(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attr, FieldValue};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use uuid::Uuid;

    crate::form_choice! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Priority {
            Low,
            High,
        }
    }

    const OPAQUE: &Shape = &Shape::builder().type_identifier("Blob").build();

    fn kind_of(shape: &'static Shape) -> WidgetKind {
        select_widget(shape, &Attributes::new(), DispatchFlags::empty()).kind
    }

    #[test]
    fn dispatch_is_total() {
        facet_form_testhelpers::setup();

        let table: &[(&'static Shape, WidgetKind)] = &[
            (i8::SHAPE, WidgetKind::Number),
            (u64::SHAPE, WidgetKind::Number),
            (f32::SHAPE, WidgetKind::Number),
            (Option::<i32>::SHAPE, WidgetKind::Number),
            (NaiveDate::SHAPE, WidgetKind::Date),
            (NaiveDateTime::SHAPE, WidgetKind::Date),
            (NaiveTime::SHAPE, WidgetKind::Time),
            (bool::SHAPE, WidgetKind::Checkbox),
            (Option::<bool>::SHAPE, WidgetKind::TriState),
            (Uuid::SHAPE, WidgetKind::Identifier),
            (Priority::SHAPE, WidgetKind::Choice),
            (String::SHAPE, WidgetKind::Text),
            (OPAQUE, WidgetKind::Fallback),
            (Option::<Option<String>>::SHAPE, WidgetKind::Text),
        ];
        for (shape, expected) in table {
            assert_eq!(kind_of(*shape), *expected, "widget for {shape}");
        }
        assert!(select_widget(OPAQUE, &Attributes::new(), DispatchFlags::empty()).disabled);
    }

    #[test]
    fn temporal_attributes_pick_the_picker() {
        facet_form_testhelpers::setup();

        let time = Attributes::new().with(Attr::Time);
        let date_time = Attributes::new().with(Attr::DateTime);
        let flags = DispatchFlags::empty();
        assert_eq!(select_widget(NaiveDateTime::SHAPE, &time, flags).kind, WidgetKind::Time);
        assert_eq!(
            select_widget(NaiveDateTime::SHAPE, &date_time, flags).kind,
            WidgetKind::DateTime
        );
        assert_eq!(
            select_widget(Option::<NaiveDate>::SHAPE, &date_time, flags).kind,
            WidgetKind::DateTime
        );
    }

    #[test]
    fn nullable_bool_in_filter_row_has_three_states() {
        facet_form_testhelpers::setup();

        let widget = select_widget(
            Option::<bool>::SHAPE,
            &Attributes::new(),
            DispatchFlags::FILTER_ROW,
        );
        assert_eq!(widget.kind, WidgetKind::TriState);
        assert_eq!(widget.state_count(), 3);
        assert_eq!(widget.options.null_label, Some(NULL_PLACEHOLDER));
        let values: Vec<_> = widget.options.choices.iter().map(|c| &c.value).collect();
        assert_eq!(values, [&Value::Bool(true), &Value::Bool(false)]);

        let outside_filter =
            select_widget(Option::<bool>::SHAPE, &Attributes::new(), DispatchFlags::empty());
        assert_eq!(outside_filter.options.null_label, None);
    }

    #[test]
    fn text_family_honours_multiline_and_password() {
        facet_form_testhelpers::setup();

        let attrs = Attributes::new().with(Attr::Multiline).with(Attr::Password);
        let widget = select_widget(String::SHAPE, &attrs, DispatchFlags::empty());
        assert_eq!(widget.kind, WidgetKind::TextArea);
        assert!(widget.options.masked);

        let secret_pin = select_widget(
            u16::SHAPE,
            &Attributes::new().with(Attr::Password),
            DispatchFlags::empty(),
        );
        assert_eq!(secret_pin.kind, WidgetKind::Number);
        assert!(secret_pin.options.masked);
    }

    #[test]
    fn read_only_disables_every_kind() {
        facet_form_testhelpers::setup();

        let read_only = Attributes::new().with(Attr::ReadOnly);
        for shape in [i32::SHAPE, bool::SHAPE, String::SHAPE, Priority::SHAPE] {
            assert!(select_widget(shape, &read_only, DispatchFlags::empty()).disabled);
            assert!(select_widget(shape, &Attributes::new(), DispatchFlags::READ_ONLY).disabled);
            assert!(!select_widget(shape, &Attributes::new(), DispatchFlags::empty()).disabled);
        }
    }
}
