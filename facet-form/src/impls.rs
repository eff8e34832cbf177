use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::{Def, NumberAffinity, Shape, TemporalKind, Value, ValueError};

/// A type that can be held by a model property and exchanged with a widget.
pub trait FieldValue: Sized {
    /// The declared shape of this type
    const SHAPE: &'static Shape;

    /// Converts to the dynamic representation
    fn to_value(&self) -> Value;

    /// Converts back from the dynamic representation
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! impl_integer {
    (@wide Signed, $e:expr) => { Value::I64($e as i64) };
    (@wide Unsigned, $e:expr) => { Value::U64($e as u64) };
    ($($ty:ty => $affinity:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const SHAPE: &'static Shape = &const {
                    Shape::builder()
                        .type_identifier(stringify!($ty))
                        .def(Def::Number(NumberAffinity::$affinity {
                            bits: <$ty>::BITS as u16,
                        }))
                        .build()
                };

                fn to_value(&self) -> Value {
                    impl_integer!(@wide $affinity, *self)
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let out_of_range = |value: String| ValueError::OutOfRange {
                        expected: Self::SHAPE,
                        value,
                    };
                    match value {
                        Value::I64(n) => <$ty>::try_from(n).map_err(|_| out_of_range(n.to_string())),
                        Value::U64(n) => <$ty>::try_from(n).map_err(|_| out_of_range(n.to_string())),
                        other => Err(ValueError::Mismatch {
                            expected: Self::SHAPE,
                            got: other.kind_name(),
                        }),
                    }
                }
            }
        )*
    };
}

impl_integer! {
    i8 => Signed,
    i16 => Signed,
    i32 => Signed,
    i64 => Signed,
    isize => Signed,
    u8 => Unsigned,
    u16 => Unsigned,
    u32 => Unsigned,
    u64 => Unsigned,
    usize => Unsigned,
}

macro_rules! impl_float {
    ($($ty:ty => $bits:expr),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const SHAPE: &'static Shape = &const {
                    Shape::builder()
                        .type_identifier(stringify!($ty))
                        .def(Def::Number(NumberAffinity::Float { bits: $bits }))
                        .build()
                };

                fn to_value(&self) -> Value {
                    Value::F64(*self as f64)
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::F64(n) => {
                            let narrowed = n as $ty;
                            if n.is_finite() && !narrowed.is_finite() {
                                return Err(ValueError::OutOfRange {
                                    expected: Self::SHAPE,
                                    value: n.to_string(),
                                });
                            }
                            Ok(narrowed)
                        }
                        Value::I64(n) => Ok(n as $ty),
                        Value::U64(n) => Ok(n as $ty),
                        other => Err(ValueError::Mismatch {
                            expected: Self::SHAPE,
                            got: other.kind_name(),
                        }),
                    }
                }
            }
        )*
    };
}

impl_float! {
    f32 => 32,
    f64 => 64,
}

/// Implements [`FieldValue`] for a type that maps onto exactly one [`Value`] variant.
macro_rules! impl_exact {
    ($ty:ty, $ident:literal, $def:expr, $variant:ident) => {
        impl FieldValue for $ty {
            const SHAPE: &'static Shape = &const {
                Shape::builder()
                    .type_identifier($ident)
                    .def($def)
                    .build()
            };

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(ValueError::Mismatch {
                        expected: Self::SHAPE,
                        got: other.kind_name(),
                    }),
                }
            }
        }
    };
}

impl_exact!(bool, "bool", Def::Bool, Bool);
impl_exact!(String, "String", Def::Text, String);
impl_exact!(NaiveDate, "NaiveDate", Def::Temporal(TemporalKind::Date), Date);
impl_exact!(
    NaiveDateTime,
    "NaiveDateTime",
    Def::Temporal(TemporalKind::DateTime),
    DateTime
);
impl_exact!(NaiveTime, "NaiveTime", Def::Temporal(TemporalKind::Time), Time);
impl_exact!(Uuid, "Uuid", Def::Identifier, Uuid);

impl<T: FieldValue> FieldValue for Option<T> {
    const SHAPE: &'static Shape = &const { Shape::option_of(T::SHAPE) };

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

/// Declares a fieldless enum that can be edited with a choice widget.
///
/// ```
/// facet_form::form_choice! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Color {
///         Red,
///         Green,
///     }
/// }
///
/// use facet_form::{FieldValue, Value};
/// assert_eq!(Color::Green.to_value(), Value::Choice("Green".into()));
/// ```
#[macro_export]
macro_rules! form_choice {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant),*
        }

        impl $crate::FieldValue for $name {
            const SHAPE: &'static $crate::Shape = &const {
                $crate::Shape::builder()
                    .type_identifier(stringify!($name))
                    .def($crate::Def::Choice($crate::ChoiceDef {
                        variants: &[$(stringify!($variant)),*],
                    }))
                    .build()
            };

            fn to_value(&self) -> $crate::Value {
                match self {
                    $($name::$variant => $crate::Value::Choice(stringify!($variant).to_string()),)*
                }
            }

            fn from_value(value: $crate::Value) -> Result<Self, $crate::ValueError> {
                match value {
                    $crate::Value::Choice(variant) => {
                        let found = match variant.as_str() {
                            $(stringify!($variant) => Some($name::$variant),)*
                            _ => None,
                        };
                        match found {
                            Some(found) => Ok(found),
                            None => Err($crate::ValueError::UnknownVariant {
                                expected: <Self as $crate::FieldValue>::SHAPE,
                                variant,
                            }),
                        }
                    }
                    other => Err($crate::ValueError::Mismatch {
                        expected: <Self as $crate::FieldValue>::SHAPE,
                        got: other.kind_name(),
                    }),
                }
            }
        }
    };
}
