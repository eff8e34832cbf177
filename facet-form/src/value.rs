use core::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::Shape;

/// A value travelling between a widget and the model it edits.
///
/// Numbers are widened to 64 bits; the declared [`Shape`] of the slot they are
/// written into decides the final representation.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// No value (an unset nullable slot)
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Any signed integer
    I64(i64),
    /// Any unsigned integer
    U64(u64),
    /// Any float or decimal
    F64(f64),
    /// Text
    String(String),
    /// Calendar date
    Date(NaiveDate),
    /// Calendar date and time of day
    DateTime(NaiveDateTime),
    /// Time of day
    Time(NaiveTime),
    /// Identifier
    Uuid(Uuid),
    /// One variant of a choice, by name
    Choice(String),
}

impl Value {
    /// Whether this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "signed integer",
            Value::U64(_) => "unsigned integer",
            Value::F64(_) => "float",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "date-time",
            Value::Time(_) => "time",
            Value::Uuid(_) => "uuid",
            Value::Choice(_) => "choice",
        }
    }

    /// Infers a declared shape from the value itself.
    ///
    /// Returns `None` for `Null` and for choices, whose variant list cannot be
    /// recovered from a single variant name.
    pub fn shape(&self) -> Option<&'static Shape> {
        use crate::FieldValue;

        Some(match self {
            Value::Null | Value::Choice(_) => return None,
            Value::Bool(_) => bool::SHAPE,
            Value::I64(_) => i64::SHAPE,
            Value::U64(_) => u64::SHAPE,
            Value::F64(_) => f64::SHAPE,
            Value::String(_) => String::SHAPE,
            Value::Date(_) => NaiveDate::SHAPE,
            Value::DateTime(_) => NaiveDateTime::SHAPE,
            Value::Time(_) => NaiveTime::SHAPE,
            Value::Uuid(_) => Uuid::SHAPE,
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::U64(n) => write!(f, "{n}"),
            Value::F64(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::Uuid(id) => write!(f, "{id}"),
            Value::Choice(variant) => f.write_str(variant),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => I64,
    i64 => I64,
    u32 => U64,
    u64 => U64,
    f64 => F64,
    String => String,
    &str => String,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    NaiveTime => Time,
    Uuid => Uuid,
}

/// A value could not be stored in, or read out as, a given type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValueError {
    /// The value is of the wrong kind altogether
    Mismatch {
        /// shape of the slot
        expected: &'static Shape,
        /// kind of value we got (see [`Value::kind_name`])
        got: &'static str,
    },

    /// The value is of the right kind, but doesn't fit
    OutOfRange {
        /// shape of the slot
        expected: &'static Shape,
        /// the offending value, formatted
        value: String,
    },

    /// A choice slot was given a variant it doesn't have
    UnknownVariant {
        /// shape of the slot
        expected: &'static Shape,
        /// the offending variant name
        variant: String,
    },
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::Mismatch { expected, got } => write!(
                f,
                "Wrong value: expected {}, but got {}",
                expected.green(),
                got.red()
            ),
            ValueError::OutOfRange { expected, value } => write!(
                f,
                "Value {} does not fit in {}",
                value.red(),
                expected.blue()
            ),
            ValueError::UnknownVariant { expected, variant } => write!(
                f,
                "{} has no variant named {}",
                expected.blue(),
                variant.red()
            ),
        }
    }
}

impl core::error::Error for ValueError {}
