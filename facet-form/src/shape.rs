use core::fmt;

use crate::{Value, ValueError};

/// Describes a declared value type: enough to pick a widget for it, compute its
/// zero value, and check values written into it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub struct Shape {
    /// Identifier for the type, without generic parameters
    pub type_identifier: &'static str,

    /// What kind of value this is
    pub def: Def,
}

/// The semantic definition of a shape: a number, a date, a choice, text...
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum Def {
    /// Integers, floats and decimals
    Number(NumberAffinity),

    /// Dates, date-times and times of day
    Temporal(TemporalKind),

    /// `bool`
    Bool,

    /// UUIDs and other opaque identifiers
    Identifier,

    /// A closed set of named variants, e.g. a fieldless enum
    Choice(ChoiceDef),

    /// Free text
    Text,

    /// Nullable wrapper around another shape
    ///
    /// e.g. `Option<T>`
    Option(&'static Shape),

    /// A type no widget knows how to edit
    Opaque,
}

/// Which family of numbers a [`Def::Number`] belongs to
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum NumberAffinity {
    /// Signed integer of the given width
    Signed {
        /// width in bits
        bits: u16,
    },
    /// Unsigned integer of the given width
    Unsigned {
        /// width in bits
        bits: u16,
    },
    /// IEEE 754 float of the given width
    Float {
        /// width in bits
        bits: u16,
    },
    /// Fixed-point decimal, carried as an `f64` value
    Decimal,
}

/// Which part of a point in time a [`Def::Temporal`] value holds
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TemporalKind {
    /// Calendar date
    Date,
    /// Calendar date and time of day
    DateTime,
    /// Time of day
    Time,
}

/// Variants of a [`Def::Choice`], in declaration order
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ChoiceDef {
    /// variant names
    pub variants: &'static [&'static str],
}

impl ChoiceDef {
    /// Returns the position of `variant`, if it is one of ours
    pub fn position(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| *v == variant)
    }
}

impl Shape {
    /// Returns a builder for Shape
    pub const fn builder() -> ShapeBuilder {
        ShapeBuilder::new()
    }

    /// Nullable wrapper around `inner`
    pub const fn option_of(inner: &'static Shape) -> Shape {
        Shape {
            type_identifier: "Option",
            def: Def::Option(inner),
        }
    }

    /// Strips any number of nullable wrappers
    pub fn unwrapped(&'static self) -> &'static Shape {
        let mut shape = self;
        while let Def::Option(inner) = shape.def {
            shape = inner;
        }
        shape
    }

    /// Whether `Null` is a legal value for this shape
    pub fn is_nullable(&self) -> bool {
        matches!(self.def, Def::Option(_))
    }

    /// Whether any widget can edit this shape
    pub fn is_supported(&'static self) -> bool {
        !matches!(self.unwrapped().def, Def::Opaque)
    }

    /// The value a freshly-constructed holder of this type would have
    pub fn zero_value(&self) -> Value {
        match self.def {
            Def::Number(NumberAffinity::Signed { .. }) => Value::I64(0),
            Def::Number(NumberAffinity::Unsigned { .. }) => Value::U64(0),
            Def::Number(NumberAffinity::Float { .. } | NumberAffinity::Decimal) => Value::F64(0.0),
            Def::Temporal(TemporalKind::Date) => Value::Date(Default::default()),
            Def::Temporal(TemporalKind::DateTime) => Value::DateTime(Default::default()),
            Def::Temporal(TemporalKind::Time) => Value::Time(Default::default()),
            Def::Bool => Value::Bool(false),
            Def::Identifier => Value::Uuid(uuid::Uuid::nil()),
            Def::Choice(choice) => match choice.variants.first() {
                Some(first) => Value::Choice((*first).to_string()),
                None => Value::Null,
            },
            Def::Text => Value::String(String::new()),
            Def::Option(_) | Def::Opaque => Value::Null,
        }
    }

    /// Checks that `value` can be stored in a slot of this shape, normalizing
    /// numbers to the representation the shape uses.
    pub fn coerce(&'static self, value: Value) -> Result<Value, ValueError> {
        let mismatch = |value: &Value| ValueError::Mismatch {
            expected: self,
            got: value.kind_name(),
        };

        match (&self.def, value) {
            (Def::Option(_), Value::Null) => Ok(Value::Null),
            (Def::Option(inner), value) => (*inner).coerce(value),
            (_, Value::Null) => Err(ValueError::Mismatch {
                expected: self,
                got: "null",
            }),
            (Def::Number(affinity), value) => coerce_number(self, *affinity, value),
            (Def::Temporal(TemporalKind::Date), v @ Value::Date(_))
            | (Def::Temporal(TemporalKind::DateTime), v @ Value::DateTime(_))
            | (Def::Temporal(TemporalKind::Time), v @ Value::Time(_))
            | (Def::Bool, v @ Value::Bool(_))
            | (Def::Identifier, v @ Value::Uuid(_))
            | (Def::Text, v @ Value::String(_)) => Ok(v),
            (Def::Choice(choice), Value::Choice(variant)) => {
                if choice.position(&variant).is_some() {
                    Ok(Value::Choice(variant))
                } else {
                    Err(ValueError::UnknownVariant {
                        expected: self,
                        variant,
                    })
                }
            }
            // opaque slots hold whatever they were given
            (Def::Opaque, v) => Ok(v),
            (_, v) => Err(mismatch(&v)),
        }
    }
}

fn coerce_number(
    shape: &'static Shape,
    affinity: NumberAffinity,
    value: Value,
) -> Result<Value, ValueError> {
    let out_of_range = |value: &Value| ValueError::OutOfRange {
        expected: shape,
        value: value.to_string(),
    };

    match (affinity, value) {
        (NumberAffinity::Signed { bits }, Value::I64(n)) => signed_in_range(bits, n)
            .then_some(Value::I64(n))
            .ok_or_else(|| out_of_range(&Value::I64(n))),
        (NumberAffinity::Signed { bits }, Value::U64(n)) => i64::try_from(n)
            .ok()
            .filter(|n| signed_in_range(bits, *n))
            .map(Value::I64)
            .ok_or_else(|| out_of_range(&Value::U64(n))),
        (NumberAffinity::Unsigned { bits }, Value::U64(n)) => unsigned_in_range(bits, n)
            .then_some(Value::U64(n))
            .ok_or_else(|| out_of_range(&Value::U64(n))),
        (NumberAffinity::Unsigned { bits }, Value::I64(n)) => u64::try_from(n)
            .ok()
            .filter(|n| unsigned_in_range(bits, *n))
            .map(Value::U64)
            .ok_or_else(|| out_of_range(&Value::I64(n))),
        (NumberAffinity::Float { bits }, Value::F64(n)) => float_in_range(bits, n)
            .then_some(Value::F64(n))
            .ok_or_else(|| out_of_range(&Value::F64(n))),
        (NumberAffinity::Decimal, Value::F64(n)) => Ok(Value::F64(n)),
        (NumberAffinity::Float { .. } | NumberAffinity::Decimal, Value::I64(n)) => {
            Ok(Value::F64(n as f64))
        }
        (NumberAffinity::Float { .. } | NumberAffinity::Decimal, Value::U64(n)) => {
            Ok(Value::F64(n as f64))
        }
        (_, v) => Err(ValueError::Mismatch {
            expected: shape,
            got: v.kind_name(),
        }),
    }
}

fn signed_in_range(bits: u16, n: i64) -> bool {
    if bits >= 64 {
        return true;
    }
    let max = (1i64 << (bits - 1)) - 1;
    (-max - 1..=max).contains(&n)
}

fn unsigned_in_range(bits: u16, n: u64) -> bool {
    bits >= 64 || n < (1u64 << bits)
}

/// A finite value must stay finite once narrowed to `bits`
fn float_in_range(bits: u16, n: f64) -> bool {
    bits > 32 || !n.is_finite() || (n as f32).is_finite()
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.def {
            Def::Option(inner) => write!(f, "Option<{inner}>"),
            _ => write!(f, "{}", self.type_identifier),
        }
    }
}

/// Builder for [`Shape`]
pub struct ShapeBuilder {
    type_identifier: Option<&'static str>,
    def: Def,
}

impl ShapeBuilder {
    /// Creates a new ShapeBuilder
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            type_identifier: None,
            def: Def::Opaque,
        }
    }

    /// Sets the type identifier for the Shape
    pub const fn type_identifier(mut self, type_identifier: &'static str) -> Self {
        self.type_identifier = Some(type_identifier);
        self
    }

    /// Sets the def for the Shape
    pub const fn def(mut self, def: Def) -> Self {
        self.def = def;
        self
    }

    /// Builds the Shape
    pub const fn build(self) -> Shape {
        Shape {
            type_identifier: self.type_identifier.unwrap(),
            def: self.def,
        }
    }
}
