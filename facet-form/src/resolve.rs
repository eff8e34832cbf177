use alloc::borrow::Cow;
use alloc::rc::Rc;
use core::fmt;

use log::debug;

use crate::{Attributes, FieldAttribute, FormError, Model, Property, Shape, Value, ValueError, ValueReference};

type Getter<M> = Rc<dyn Fn(&M) -> Option<Value>>;
type Setter<M> = Rc<dyn Fn(&mut M, Value) -> Result<(), ValueError>>;

/// Where a descriptor's value lives
#[derive(Clone, Copy, Debug)]
pub(crate) enum Origin {
    /// A real member of a typed model
    Member {
        owner: &'static str,
        attributes: &'static [FieldAttribute],
    },
    /// A key of an open bag
    Key,
}

/// Metadata and accessors for one property of a model.
///
/// Produced by [`FormModel::resolve`] and [`FormModel::property`]; cheap to
/// clone.
pub struct PropertyDescriptor<M> {
    name: Cow<'static, str>,
    shape: Option<&'static Shape>,
    attributes: Attributes,
    origin: Origin,
    getter: Getter<M>,
    setter: Option<Setter<M>>,
}

impl<M: 'static> PropertyDescriptor<M> {
    /// Describes a static property of a typed model
    pub fn from_property(owner: &'static str, property: &'static Property<M>) -> Self {
        Self {
            name: Cow::Borrowed(property.name),
            shape: Some(property.shape),
            attributes: Attributes::from_static(property.attributes),
            origin: Origin::Member {
                owner,
                attributes: property.attributes,
            },
            getter: Rc::new(property.get),
            setter: property.set.map(|set| Rc::new(set) as Setter<M>),
        }
    }

    pub(crate) fn synthetic(
        name: String,
        shape: Option<&'static Shape>,
        getter: Getter<M>,
        setter: Setter<M>,
    ) -> Self {
        Self {
            name: Cow::Owned(name),
            shape,
            attributes: Attributes::new(),
            origin: Origin::Key,
            getter,
            setter: Some(setter),
        }
    }
}

impl<M> PropertyDescriptor<M> {
    /// Name of the property (or bag key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type, if known
    pub fn shape(&self) -> Option<&'static Shape> {
        self.shape
    }

    /// Attributes attached to the property itself
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Whether the property has no setter
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// Whether this describes a key of an open bag rather than a real member
    pub fn is_synthetic(&self) -> bool {
        matches!(self.origin, Origin::Key)
    }

    /// Reads the current value. `None` means a holder on the way to the
    /// property is absent.
    pub fn get(&self, model: &M) -> Option<Value> {
        (self.getter)(model)
    }

    /// Writes `value` into `model`
    pub fn set(&self, model: &mut M, value: Value) -> Result<(), FormError> {
        match &self.setter {
            Some(setter) => Ok(setter(model, value)?),
            None => Err(FormError::ReadOnly {
                field: self.name.to_string(),
            }),
        }
    }

    /// The reference handed to the validation engine. `None` when the
    /// declared type is unknown.
    pub fn reference(&self) -> Option<ValueReference> {
        let shape = self.shape?;
        Some(match self.origin {
            Origin::Member { owner, attributes } => ValueReference::Member {
                owner,
                path: self.name.clone(),
                attributes,
            },
            Origin::Key => ValueReference::Key {
                key: self.name.to_string(),
                shape,
            },
        })
    }
}

impl<M> Clone for PropertyDescriptor<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            shape: self.shape,
            attributes: self.attributes.clone(),
            origin: self.origin,
            getter: self.getter.clone(),
            setter: self.setter.clone(),
        }
    }
}

impl<M> fmt::Debug for PropertyDescriptor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("attributes", &self.attributes)
            .field("read_only", &self.is_read_only())
            .field("synthetic", &self.is_synthetic())
            .finish()
    }
}

/// Anything a form can edit: a typed [`Model`] or an open [`Bag`](crate::Bag).
pub trait FormModel: Sized + 'static {
    /// Identifier of the model type, for log and error messages
    fn type_identifier(&self) -> &str;

    /// Every property, in declaration (or insertion) order
    fn resolve(&self) -> Vec<PropertyDescriptor<Self>>;

    /// The property called `name`. `declared` is the type an explicit field
    /// declares for it; models without static types rely on it.
    fn property(
        &self,
        name: &str,
        declared: Option<&'static Shape>,
    ) -> Option<PropertyDescriptor<Self>>;

    /// Whether a property called `name` exists without a declared type
    fn has_property(&self, name: &str) -> bool {
        self.property(name, None).is_some()
    }

    /// Current value of `name`, `Null` if it can't be read
    fn read(&self, name: &str) -> Value {
        self.property(name, None)
            .and_then(|p| p.get(self))
            .unwrap_or(Value::Null)
    }
}

impl<T: Model> FormModel for T {
    fn type_identifier(&self) -> &str {
        T::SHAPE.type_identifier
    }

    fn resolve(&self) -> Vec<PropertyDescriptor<Self>> {
        let shape = T::SHAPE;
        debug!(
            "Resolving {} properties of {}",
            shape.properties.len(),
            shape.type_identifier
        );
        shape
            .properties
            .iter()
            .map(|p| PropertyDescriptor::from_property(shape.type_identifier, p))
            .collect()
    }

    fn property(
        &self,
        name: &str,
        declared: Option<&'static Shape>,
    ) -> Option<PropertyDescriptor<Self>> {
        let property = T::SHAPE.property(name)?;
        if let Some(declared) = declared {
            if declared != property.shape {
                debug!(
                    "{}.{} is declared as {declared} but the property is {}, using the latter",
                    T::SHAPE.type_identifier,
                    name,
                    property.shape
                );
            }
        }
        Some(PropertyDescriptor::from_property(
            T::SHAPE.type_identifier,
            property,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldValue;

    crate::form_model! {
        #[derive(Debug, Default)]
        struct Account {
            #[form(read_only)]
            login: String,
            #[form(row = 2)]
            #[form(display = "Balance")]
            balance: Option<f64>,
        }
    }

    #[test]
    fn typed_models_resolve_in_declaration_order() {
        facet_form_testhelpers::setup();

        let account = Account::default();
        let properties = account.resolve();
        let names: Vec<_> = properties.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["login", "balance"]);

        let balance = &properties[1];
        assert_eq!(balance.shape(), Some(Option::<f64>::SHAPE));
        assert_eq!(balance.attributes().row(), 2);
        assert_eq!(balance.attributes().display(), Some("Balance"));
        assert!(!balance.is_synthetic());
        // the attribute alone doesn't remove the setter
        assert!(properties[0].attributes().is_read_only());
        assert!(!properties[0].is_read_only());
    }

    #[test]
    fn descriptors_read_and_write_through_accessors() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let mut account = Account::default();
        let balance = account
            .property("balance", None)
            .ok_or_else(|| eyre::eyre!("no balance property"))?;

        assert_eq!(balance.get(&account), Some(Value::Null));
        balance.set(&mut account, Value::I64(12))?;
        assert_eq!(account.balance, Some(12.0));
        assert_eq!(account.read("balance"), Value::F64(12.0));

        let err = balance
            .set(&mut account, Value::String("lots".into()))
            .unwrap_err();
        assert!(matches!(err, FormError::Value(ValueError::Mismatch { .. })));

        let Some(ValueReference::Member { owner, path, .. }) = balance.reference() else {
            panic!("typed properties must produce member references");
        };
        assert_eq!((owner, &*path), ("Account", "balance"));
        Ok(())
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        facet_form_testhelpers::setup();

        let account = Account::default();
        assert!(account.property("nickname", Some(String::SHAPE)).is_none());
        assert!(!account.has_property("nickname"));
        assert_eq!(account.read("nickname"), Value::Null);
    }
}
