use core::mem::discriminant;

/// An attribute that can be set on a model property.
///
/// Declared through `#[form(...)]` in [`form_model!`](crate::form_model), which
/// stores the attribute's tokens verbatim; [`Attr::parse`] gives them meaning.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum FieldAttribute {
    /// Custom field attribute containing arbitrary text
    Arbitrary(&'static str),
}

/// A parsed field attribute.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum Attr {
    /// Never rendered
    Hidden,
    /// Rendered, but its widget is disabled
    ReadOnly,
    /// Shares a row with every other field of the same row id
    Row(u32),
    /// Label to show instead of the property name
    Display(String),
    /// Masked input
    Password,
    /// Multi-line text area instead of a single-line input
    Multiline,
    /// Temporal values are edited as a time of day
    Time,
    /// Temporal values are edited as a date and a time of day
    DateTime,
    /// A rule tag for the validation engine; not interpreted here
    Validate(String),
    /// Anything we don't recognize, kept verbatim
    Other(String),
}

impl Attr {
    /// Parses an attribute like `hidden`, `row = 2` or `display = "Full name"`.
    pub fn parse(raw: &str) -> Attr {
        let raw = raw.trim();
        let (key, value) = match raw.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim().trim_matches('"'))),
            None => (raw, None),
        };

        match (key, value) {
            ("hidden", None) => Attr::Hidden,
            ("read_only" | "readonly", None) => Attr::ReadOnly,
            ("row", Some(value)) => match value.parse() {
                Ok(row) => Attr::Row(row),
                Err(_) => Attr::Other(raw.to_string()),
            },
            ("display" | "display_name", Some(value)) => Attr::Display(value.to_string()),
            ("password", None) => Attr::Password,
            ("multiline" | "text_area" | "textarea", None) => Attr::Multiline,
            ("time", None) => Attr::Time,
            ("date_time" | "datetime", None) => Attr::DateTime,
            ("validate", Some(value)) => Attr::Validate(value.to_string()),
            _ => Attr::Other(raw.to_string()),
        }
    }

    /// Whether a field carries at most one attribute of this kind.
    fn is_single_valued(&self) -> bool {
        !matches!(self, Attr::Validate(_) | Attr::Other(_))
    }
}

impl From<FieldAttribute> for Attr {
    fn from(attr: FieldAttribute) -> Self {
        match attr {
            FieldAttribute::Arbitrary(raw) => Attr::parse(raw),
        }
    }
}

/// An ordered set of [`Attr`]s.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Attributes {
    attrs: Vec<Attr>,
}

impl Attributes {
    /// An empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the static attributes of a model property
    pub fn from_static(attrs: &[FieldAttribute]) -> Self {
        let mut out = Self::new();
        for attr in attrs {
            out.insert(Attr::from(*attr));
        }
        out
    }

    /// Adds `attr`, replacing an attribute of the same kind if it is
    /// single-valued.
    pub fn insert(&mut self, attr: Attr) {
        if attr.is_single_valued() {
            if let Some(existing) = self
                .attrs
                .iter_mut()
                .find(|a| discriminant(&**a) == discriminant(&attr))
            {
                *existing = attr;
                return;
            }
        } else if self.attrs.contains(&attr) {
            return;
        }
        self.attrs.push(attr);
    }

    /// Builder-style [`Attributes::insert`]
    pub fn with(mut self, attr: Attr) -> Self {
        self.insert(attr);
        self
    }

    /// Union of `explicit` and `inherited`. Where both carry a single-valued
    /// attribute (row, display...), the explicit one wins.
    pub fn merge(explicit: &Attributes, inherited: &Attributes) -> Attributes {
        let mut out = explicit.clone();
        for attr in &inherited.attrs {
            let present = if attr.is_single_valued() {
                out.attrs
                    .iter()
                    .any(|a| discriminant(a) == discriminant(attr))
            } else {
                out.attrs.contains(attr)
            };
            if !present {
                out.attrs.push(attr.clone());
            }
        }
        out
    }

    /// Iterates in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attrs.iter()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Whether `attr` is in the set
    pub fn contains(&self, attr: &Attr) -> bool {
        self.attrs.contains(attr)
    }

    /// `hidden`
    pub fn is_hidden(&self) -> bool {
        self.contains(&Attr::Hidden)
    }

    /// `read_only`
    pub fn is_read_only(&self) -> bool {
        self.contains(&Attr::ReadOnly)
    }

    /// `password`
    pub fn is_password(&self) -> bool {
        self.contains(&Attr::Password)
    }

    /// `multiline`
    pub fn is_multiline(&self) -> bool {
        self.contains(&Attr::Multiline)
    }

    /// `time`
    pub fn wants_time(&self) -> bool {
        self.contains(&Attr::Time)
    }

    /// `date_time`
    pub fn wants_date_time(&self) -> bool {
        self.contains(&Attr::DateTime)
    }

    /// Row id, 0 when the field has no row affinity
    pub fn row(&self) -> u32 {
        self.attrs
            .iter()
            .find_map(|a| match a {
                Attr::Row(row) => Some(*row),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// `display = "..."`
    pub fn display(&self) -> Option<&str> {
        self.attrs.iter().find_map(|a| match a {
            Attr::Display(label) => Some(label.as_str()),
            _ => None,
        })
    }

    /// Every `validate = "..."` tag, in order
    pub fn validations(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().filter_map(|a| match a {
            Attr::Validate(rule) => Some(rule.as_str()),
            _ => None,
        })
    }
}

impl FromIterator<Attr> for Attributes {
    fn from_iter<I: IntoIterator<Item = Attr>>(iter: I) -> Self {
        let mut out = Attributes::new();
        for attr in iter {
            out.insert(attr);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stringified_attribute_tokens() {
        facet_form_testhelpers::setup();

        assert_eq!(Attr::parse("hidden"), Attr::Hidden);
        assert_eq!(Attr::parse("read_only"), Attr::ReadOnly);
        assert_eq!(Attr::parse("row = 3"), Attr::Row(3));
        assert_eq!(
            Attr::parse(r#"display = "Full name""#),
            Attr::Display("Full name".into())
        );
        assert_eq!(Attr::parse("text_area"), Attr::Multiline);
        assert_eq!(Attr::parse("row = many"), Attr::Other("row = many".into()));
        assert_eq!(Attr::parse("sparkly"), Attr::Other("sparkly".into()));
    }

    #[test]
    fn explicit_attributes_take_precedence_in_merge() {
        facet_form_testhelpers::setup();

        let inherited = Attributes::from_static(&[
            FieldAttribute::Arbitrary("row = 1"),
            FieldAttribute::Arbitrary("password"),
            FieldAttribute::Arbitrary(r#"validate = "min:3""#),
        ]);
        let explicit = Attributes::new()
            .with(Attr::Row(4))
            .with(Attr::ReadOnly)
            .with(Attr::Validate("max:9".into()));

        let merged = Attributes::merge(&explicit, &inherited);
        assert_eq!(merged.row(), 4);
        assert!(merged.is_read_only());
        assert!(merged.is_password());
        assert_eq!(merged.validations().collect::<Vec<_>>(), ["max:9", "min:3"]);
    }

    #[test]
    fn single_valued_attributes_are_replaced() {
        facet_form_testhelpers::setup();

        let attrs: Attributes = [Attr::Row(1), Attr::Hidden, Attr::Row(2), Attr::Hidden]
            .into_iter()
            .collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.row(), 2);
        assert_eq!(Attributes::new().row(), 0);
    }
}
