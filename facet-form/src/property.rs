use core::fmt;

use crate::{FieldAttribute, Shape, Value, ValueError};

/// A strongly-typed model whose properties are known statically.
///
/// Usually implemented with [`form_model!`](crate::form_model); implement it by
/// hand to expose computed (getter-only) properties or nested paths.
pub trait Model: Sized + 'static {
    /// The properties of this model, in declaration order
    const SHAPE: &'static ModelShape<Self>;
}

/// Static description of a [`Model`]
pub struct ModelShape<M: 'static> {
    /// Identifier for the model type
    pub type_identifier: &'static str,

    /// All properties, in declaration order
    pub properties: &'static [Property<M>],
}

impl<M> ModelShape<M> {
    /// Looks up a property by name (or dotted path)
    pub fn property(&self, name: &str) -> Option<&'static Property<M>> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Reads a property. Returns `None` when a holder on the way to the property
/// is absent (e.g. `address.street` while `address` is `None`).
pub type GetFn<M> = fn(&M) -> Option<Value>;

/// Writes a property.
pub type SetFn<M> = fn(&mut M, Value) -> Result<(), ValueError>;

/// One property of a [`Model`]
#[non_exhaustive]
pub struct Property<M: 'static> {
    /// Name of the property; nested properties use a dotted path
    pub name: &'static str,

    /// Declared type of the property
    pub shape: &'static Shape,

    /// Arbitrary attributes set via `#[form(...)]`
    pub attributes: &'static [FieldAttribute],

    /// Reads the property
    pub get: GetFn<M>,

    /// Writes the property; `None` for read-only properties
    pub set: Option<SetFn<M>>,
}

impl<M> Property<M> {
    /// Returns a builder for Property
    pub const fn builder() -> PropertyBuilder<M> {
        PropertyBuilder::new()
    }

    /// Whether the property has no setter
    pub fn is_read_only(&self) -> bool {
        self.set.is_none()
    }
}

impl<M> Clone for Property<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Property<M> {}

impl<M> fmt::Debug for Property<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("attributes", &self.attributes)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

/// Builder for [`Property`]
pub struct PropertyBuilder<M: 'static> {
    name: Option<&'static str>,
    shape: Option<&'static Shape>,
    attributes: &'static [FieldAttribute],
    get: Option<GetFn<M>>,
    set: Option<SetFn<M>>,
}

impl<M> PropertyBuilder<M> {
    /// Creates a new PropertyBuilder
    #[allow(clippy::new_without_default)]
    pub const fn new() -> Self {
        Self {
            name: None,
            shape: None,
            attributes: &[],
            get: None,
            set: None,
        }
    }

    /// Sets the name for the Property
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Sets the shape for the Property
    pub const fn shape(mut self, shape: &'static Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Sets the attributes for the Property
    pub const fn attributes(mut self, attributes: &'static [FieldAttribute]) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the getter for the Property
    pub const fn get(mut self, get: GetFn<M>) -> Self {
        self.get = Some(get);
        self
    }

    /// Sets the setter for the Property
    pub const fn set(mut self, set: SetFn<M>) -> Self {
        self.set = Some(set);
        self
    }

    /// Builds the Property
    pub const fn build(self) -> Property<M> {
        Property {
            name: self.name.unwrap(),
            shape: self.shape.unwrap(),
            attributes: self.attributes,
            get: self.get.unwrap(),
            set: self.set,
        }
    }
}

/// Declares a struct and implements [`Model`] for it.
///
/// Every field type must implement [`FieldValue`](crate::FieldValue). Field
/// attributes go in `#[form(...)]`; they are kept verbatim as
/// [`FieldAttribute::Arbitrary`] and parsed by [`Attr::parse`](crate::Attr::parse).
///
/// ```
/// facet_form::form_model! {
///     #[derive(Debug, Default)]
///     pub struct Person {
///         #[form(row = 1)]
///         pub age: i32,
///         #[form(row = 1)]
///         #[form(display = "Full name")]
///         pub name: String,
///         #[form(hidden)]
///         pub internal_id: u64,
///     }
/// }
///
/// use facet_form::Model;
/// assert_eq!(Person::SHAPE.properties.len(), 3);
/// assert_eq!(Person::SHAPE.properties[1].name, "name");
/// ```
#[macro_export]
macro_rules! form_model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[form($($attr:tt)*)])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($fvis $field: $ty),*
        }

        impl $crate::Model for $name {
            const SHAPE: &'static $crate::ModelShape<Self> = &$crate::ModelShape {
                type_identifier: stringify!($name),
                properties: &[
                    $({
                        fn get(model: &$name) -> Option<$crate::Value> {
                            Some($crate::FieldValue::to_value(&model.$field))
                        }

                        fn set(
                            model: &mut $name,
                            value: $crate::Value,
                        ) -> Result<(), $crate::ValueError> {
                            model.$field = <$ty as $crate::FieldValue>::from_value(value)?;
                            Ok(())
                        }

                        $crate::Property::builder()
                            .name(stringify!($field))
                            .shape(<$ty as $crate::FieldValue>::SHAPE)
                            .attributes(&[
                                $($crate::FieldAttribute::Arbitrary(stringify!($($attr)*))),*
                            ])
                            .get(get)
                            .set(set)
                            .build()
                    }),*
                ],
            };
        }
    };
}
