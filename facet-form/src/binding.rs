use alloc::borrow::Cow;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use log::trace;

use crate::{FieldAttribute, FormError, FormModel, PropertyDescriptor, Shape, Value};

/// What a binding points at, as seen by the validation engine.
///
/// Typed models produce [`ValueReference::Member`], which names a real member
/// whose validation metadata applies. Bag keys produce [`ValueReference::Key`]:
/// there is no member to reflect rules from, only the key and the type the
/// field declared.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueReference {
    /// A member of a typed model
    Member {
        /// type identifier of the model
        owner: &'static str,
        /// property name or dotted path
        path: Cow<'static, str>,
        /// the member's own attributes
        attributes: &'static [FieldAttribute],
    },

    /// A key of an open bag
    Key {
        /// the key
        key: String,
        /// the type the field declared for it
        shape: &'static Shape,
    },
}

impl ValueReference {
    /// Property name or key
    pub fn name(&self) -> &str {
        match self {
            ValueReference::Member { path, .. } => path,
            ValueReference::Key { key, .. } => key,
        }
    }

    /// Whether this names a real member
    pub fn is_member(&self) -> bool {
        matches!(self, ValueReference::Member { .. })
    }
}

impl fmt::Display for ValueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueReference::Member { owner, path, .. } => write!(f, "{owner}.{path}"),
            ValueReference::Key { key, .. } => write!(f, "[{key:?}]"),
        }
    }
}

/// Identity of one model instance, for change tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelId(usize);

impl ModelId {
    /// Identity of the instance behind `model`
    pub fn of<M>(model: &Rc<RefCell<M>>) -> Self {
        ModelId(Rc::as_ptr(model) as *const () as usize)
    }
}

/// A field of a given model instance: the unit of change tracking.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldIdentifier {
    model: ModelId,
    field: String,
}

impl FieldIdentifier {
    /// Creates a new identifier
    pub fn new(model: ModelId, field: impl Into<String>) -> Self {
        Self {
            model,
            field: field.into(),
        }
    }

    /// The model instance
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// The field name
    pub fn field(&self) -> &str {
        &self.field
    }
}

pub(crate) type ChangeNotifier<M> = Rc<dyn Fn(FieldIdentifier, &Value, &M) -> Result<(), FormError>>;

type BindingGetter = Rc<dyn Fn() -> Result<Value, FormError>>;
type BindingSetter = Rc<dyn Fn(Value) -> Result<(), FormError>>;

/// How much of the model a [`Binding`] can reach
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingMode {
    /// Reads and writes
    Live,
    /// Reads only
    ReadOnly,
    /// A holder on the way to the property is absent; the binding only
    /// carries the zero value
    Detached,
}

/// A two-way connection between one widget and the model storage behind it.
///
/// Built fresh on every render pass.
#[derive(Clone)]
pub struct Binding {
    name: String,
    value: Value,
    mode: BindingMode,
    reference: ValueReference,
    getter: Option<BindingGetter>,
    setter: Option<BindingSetter>,
}

impl Binding {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value at the time the binding was built
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Live, read-only or detached
    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    /// Whether writes are accepted
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Reference for the validation engine
    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }

    /// Reads the current value from the model
    pub fn get(&self) -> Result<Value, FormError> {
        match &self.getter {
            Some(getter) => getter(),
            None => Ok(self.value.clone()),
        }
    }

    /// Writes `value` into the model and notifies the form
    pub fn set(&self, value: impl Into<Value>) -> Result<(), FormError> {
        match &self.setter {
            Some(setter) => setter(value.into()),
            None => Err(FormError::ReadOnly {
                field: self.name.clone(),
            }),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("mode", &self.mode)
            .field("reference", &self.reference)
            .finish()
    }
}

/// Binds `descriptor` of `model` without change notifications.
///
/// `read_only` forces a get-only binding on top of the descriptor's own
/// read-only flag.
pub fn bind<M: FormModel>(
    descriptor: &PropertyDescriptor<M>,
    model: &Rc<RefCell<M>>,
    read_only: bool,
) -> Result<Binding, FormError> {
    bind_with(descriptor, model, read_only, None)
}

pub(crate) fn bind_with<M: FormModel>(
    descriptor: &PropertyDescriptor<M>,
    model: &Rc<RefCell<M>>,
    read_only: bool,
    notifier: Option<ChangeNotifier<M>>,
) -> Result<Binding, FormError> {
    let name = descriptor.name().to_string();
    let unresolved = || FormError::UnresolvedType {
        field: descriptor.name().to_string(),
    };
    let shape = descriptor.shape().ok_or_else(unresolved)?;
    let reference = descriptor.reference().ok_or_else(unresolved)?;

    let current = {
        let model = model.try_borrow().map_err(|_| FormError::ModelBusy)?;
        descriptor.get(&model)
    };

    let Some(current) = current else {
        trace!("{name}: holder is absent, binding detached");
        return Ok(Binding {
            name,
            value: shape.zero_value(),
            mode: BindingMode::Detached,
            reference,
            getter: None,
            setter: None,
        });
    };

    let value = if current.is_null() && !shape.is_nullable() {
        shape.zero_value()
    } else {
        current
    };

    let getter: BindingGetter = {
        let descriptor = descriptor.clone();
        let model = model.clone();
        Rc::new(move || -> Result<Value, FormError> {
            let model = model.try_borrow().map_err(|_| FormError::ModelBusy)?;
            Ok(descriptor
                .get(&model)
                .unwrap_or_else(|| shape.zero_value()))
        })
    };

    if read_only || descriptor.is_read_only() {
        return Ok(Binding {
            name,
            value,
            mode: BindingMode::ReadOnly,
            reference,
            getter: Some(getter),
            setter: None,
        });
    }

    let setter: BindingSetter = {
        let descriptor = descriptor.clone();
        let model = model.clone();
        let id = ModelId::of(&model);
        Rc::new(move |value: Value| -> Result<(), FormError> {
            {
                let mut model = model.try_borrow_mut().map_err(|_| FormError::ModelBusy)?;
                descriptor.set(&mut *model, value)?;
            }
            let model = model.try_borrow().map_err(|_| FormError::ModelBusy)?;
            let written = descriptor.get(&*model).unwrap_or(Value::Null);
            trace!("{} <- {written:?}", descriptor.name());
            match &notifier {
                Some(notify) => notify(
                    FieldIdentifier::new(id, descriptor.name()),
                    &written,
                    &*model,
                ),
                None => Ok(()),
            }
        })
    };

    Ok(Binding {
        name,
        value,
        mode: BindingMode::Live,
        reference,
        getter: Some(getter),
        setter: Some(setter),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bag, FieldValue, Model, Property};

    #[derive(Debug, Default)]
    struct Address {
        street: String,
    }

    #[derive(Debug, Default)]
    struct Customer {
        address: Option<Address>,
    }

    fn get_street(customer: &Customer) -> Option<Value> {
        customer
            .address
            .as_ref()
            .map(|address| address.street.to_value())
    }

    fn set_street(customer: &mut Customer, value: Value) -> Result<(), crate::ValueError> {
        customer.address.get_or_insert_with(Address::default).street = String::from_value(value)?;
        Ok(())
    }

    impl Model for Customer {
        const SHAPE: &'static crate::ModelShape<Self> = &crate::ModelShape {
            type_identifier: "Customer",
            properties: &[Property::builder()
                .name("address.street")
                .shape(String::SHAPE)
                .get(get_street)
                .set(set_street)
                .build()],
        };
    }

    #[test]
    fn absent_holder_yields_a_detached_binding() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let model = Rc::new(RefCell::new(Customer::default()));
        let descriptor = model
            .borrow()
            .property("address.street", None)
            .ok_or_else(|| eyre::eyre!("missing property"))?;

        let binding = bind(&descriptor, &model, false)?;
        assert_eq!(binding.mode(), BindingMode::Detached);
        assert_eq!(binding.value(), &Value::String(String::new()));
        assert!(!binding.is_writable());
        assert!(matches!(binding.set("Main St"), Err(FormError::ReadOnly { .. })));
        assert!(model.borrow().address.is_none());

        model.borrow_mut().address = Some(Address {
            street: "Elm St".into(),
        });
        let binding = bind(&descriptor, &model, false)?;
        assert_eq!(binding.mode(), BindingMode::Live);
        binding.set("Main St")?;
        assert_eq!(binding.get()?, Value::String("Main St".into()));
        Ok(())
    }

    #[test]
    fn read_only_binds_get_only() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let model = Rc::new(RefCell::new(Bag::new().with("x", 5)));
        let descriptor = model
            .borrow()
            .property("x", Some(i32::SHAPE))
            .ok_or_else(|| eyre::eyre!("bags always resolve"))?;

        let binding = bind(&descriptor, &model, true)?;
        assert_eq!(binding.mode(), BindingMode::ReadOnly);
        assert_eq!(binding.value(), &Value::I64(5));
        assert!(binding.set(6).is_err());
        assert_eq!(model.borrow().get("x"), Some(&Value::I64(5)));
        assert!(!binding.reference().is_member());
        Ok(())
    }

    #[test]
    fn missing_type_is_a_configuration_error() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let model = Rc::new(RefCell::new(Bag::new()));
        let descriptor = model
            .borrow()
            .property("untyped", None)
            .ok_or_else(|| eyre::eyre!("bags always resolve"))?;
        let err = bind(&descriptor, &model, false).unwrap_err();
        assert!(matches!(&err, FormError::UnresolvedType { field } if field == "untyped"));
        assert!(err.to_string().ends_with("; declare it explicitly"));
        Ok(())
    }
}
