use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use indexmap::IndexMap;
use log::debug;

use crate::{
    Attr, Attributes, Binding, FieldValue, Form, FormError, FormModel, PropertyDescriptor, Shape,
    Value,
};

/// Renders a complex field in place of a dispatched widget
pub type ComplexTemplate<M, R> = Rc<dyn Fn(&mut R, &ComplexContext<'_, M>)>;

/// Renders a generator field
pub type GeneratorTemplate<M, R> = Rc<dyn Fn(&mut R, &GeneratorContext<'_, M, R>)>;

/// What a complex field's template gets to work with: everything a
/// dispatched widget would get.
pub struct ComplexContext<'a, M> {
    /// The model being edited
    pub model: &'a Rc<RefCell<M>>,
    /// Id for the input, shared with its label
    pub input_id: &'a str,
    /// Current value of the property
    pub value: &'a Value,
    /// Live accessor to the property
    pub binding: &'a Binding,
}

/// What a generator field's template gets to work with.
pub struct GeneratorContext<'a, M, R> {
    /// The form being rendered
    pub form: &'a Form<M, R>,
}

/// A field backed by a model property, referenced by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyField {
    name: Option<String>,
    shape: Option<&'static Shape>,
    attributes: Attributes,
    input_attributes: IndexMap<String, String>,
    cell_style: Option<String>,
}

impl PropertyField {
    /// A field for the property (or bag key) `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// An intentionally empty slot: takes up layout space, edits nothing
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Declares the type of the property
    pub fn of_type(mut self, shape: &'static Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Declares the type of the property as `T`
    pub fn typed<T: FieldValue>(self) -> Self {
        self.of_type(T::SHAPE)
    }

    /// Adds an attribute; it takes precedence over the property's own
    pub fn attr(mut self, attr: Attr) -> Self {
        self.attributes.insert(attr);
        self
    }

    /// Shorthand for `attr(Attr::Row(row))`
    pub fn row(self, row: u32) -> Self {
        self.attr(Attr::Row(row))
    }

    /// Shorthand for `attr(Attr::ReadOnly)`
    pub fn read_only(self) -> Self {
        self.attr(Attr::ReadOnly)
    }

    /// Adds an attribute forwarded verbatim to the widget
    pub fn input_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.input_attributes.insert(name.into(), value.into());
        self
    }

    /// Style of the cell this field renders in, in table-row mode
    pub fn cell_style(mut self, style: impl Into<String>) -> Self {
        self.cell_style = Some(style.into());
        self
    }

    /// Renders this field with `template` instead of a dispatched widget
    pub fn complex<M, R>(
        self,
        template: impl Fn(&mut R, &ComplexContext<'_, M>) + 'static,
    ) -> Field<M, R> {
        Field::Complex(ComplexField {
            field: self,
            template: Rc::new(template),
        })
    }

    /// Property name; `None` for placeholders
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared type, if any
    pub fn shape(&self) -> Option<&'static Shape> {
        self.shape
    }

    /// Explicit attributes
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Attributes forwarded to the widget
    pub fn input_attributes(&self) -> &IndexMap<String, String> {
        &self.input_attributes
    }

    /// Style of the table cell
    pub fn style_of_cell(&self) -> Option<&str> {
        self.cell_style.as_deref()
    }
}

/// A property field rendered by a caller-supplied template
pub struct ComplexField<M, R> {
    field: PropertyField,
    template: ComplexTemplate<M, R>,
}

impl<M, R> ComplexField<M, R> {
    /// The backing property field
    pub fn field(&self) -> &PropertyField {
        &self.field
    }

    /// The template
    pub fn template(&self) -> &ComplexTemplate<M, R> {
        &self.template
    }
}

/// A render unit with no backing property
pub struct GeneratorField<M, R> {
    attributes: Attributes,
    template: GeneratorTemplate<M, R>,
}

impl<M, R> GeneratorField<M, R> {
    /// Layout attributes (only `row` matters)
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The template
    pub fn template(&self) -> &GeneratorTemplate<M, R> {
        &self.template
    }
}

/// One render unit of a form.
pub enum Field<M, R> {
    /// Backed by a property, edited by a dispatched widget
    Property(PropertyField),
    /// Backed by a property, rendered by a template
    Complex(ComplexField<M, R>),
    /// Not backed by anything, rendered by a template
    Generator(GeneratorField<M, R>),
}

impl<M, R> Field<M, R> {
    /// A property field for `name`
    pub fn property(name: impl Into<String>) -> Self {
        Field::Property(PropertyField::new(name))
    }

    /// A generator field in row `row` (0 for a row of its own)
    pub fn generator(
        row: u32,
        template: impl Fn(&mut R, &GeneratorContext<'_, M, R>) + 'static,
    ) -> Self {
        let attributes = if row == 0 {
            Attributes::new()
        } else {
            Attributes::new().with(Attr::Row(row))
        };
        Field::Generator(GeneratorField {
            attributes,
            template: Rc::new(template),
        })
    }

    /// The property field behind this field, if any
    pub fn property_field(&self) -> Option<&PropertyField> {
        match self {
            Field::Property(field) => Some(field),
            Field::Complex(complex) => Some(&complex.field),
            Field::Generator(_) => None,
        }
    }

    /// Explicit attributes
    pub fn attributes(&self) -> &Attributes {
        match self {
            Field::Property(field) => &field.attributes,
            Field::Complex(complex) => &complex.field.attributes,
            Field::Generator(generator) => &generator.attributes,
        }
    }
}

impl<M, R> From<PropertyField> for Field<M, R> {
    fn from(field: PropertyField) -> Self {
        Field::Property(field)
    }
}

impl<M, R> Clone for Field<M, R> {
    fn clone(&self) -> Self {
        match self {
            Field::Property(field) => Field::Property(field.clone()),
            Field::Complex(complex) => Field::Complex(ComplexField {
                field: complex.field.clone(),
                template: complex.template.clone(),
            }),
            Field::Generator(generator) => Field::Generator(GeneratorField {
                attributes: generator.attributes.clone(),
                template: generator.template.clone(),
            }),
        }
    }
}

impl<M, R> fmt::Debug for Field<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Property(field) => f.debug_tuple("Property").field(field).finish(),
            Field::Complex(complex) => f.debug_tuple("Complex").field(&complex.field).finish(),
            Field::Generator(generator) => f
                .debug_tuple("Generator")
                .field(&generator.attributes)
                .finish(),
        }
    }
}

/// A field matched against the model, ready for layout.
pub struct ResolvedField<M, R> {
    /// The field as declared (or synthesized from a property)
    pub field: Field<M, R>,

    /// The backing property; `None` for generators and placeholders
    pub descriptor: Option<PropertyDescriptor<M>>,

    /// Explicit attributes merged over the property's own
    pub attributes: Attributes,
}

impl<M, R> ResolvedField<M, R> {
    /// Property name, if the field has one
    pub fn name(&self) -> Option<&str> {
        self.field.property_field().and_then(PropertyField::name)
    }
}

impl<M, R> fmt::Debug for ResolvedField<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedField")
            .field("field", &self.field)
            .field("descriptor", &self.descriptor)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Matches `explicit` fields against `model`.
///
/// A non-empty explicit list is authoritative; an empty one means "one field
/// per property, in resolution order". Hidden fields are dropped either way.
pub fn reconcile<M: FormModel, R>(
    explicit: &[Field<M, R>],
    model: &M,
) -> Result<Vec<ResolvedField<M, R>>, FormError> {
    let resolved = if explicit.is_empty() {
        model
            .resolve()
            .into_iter()
            .map(|descriptor| ResolvedField {
                field: Field::property(descriptor.name()),
                attributes: descriptor.attributes().clone(),
                descriptor: Some(descriptor),
            })
            .collect()
    } else {
        explicit
            .iter()
            .map(|field| resolve_field(field, model))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(resolved
        .into_iter()
        .filter(|field| {
            let hidden = field.attributes.is_hidden();
            if hidden {
                debug!("Dropping hidden field {:?}", field.name());
            }
            !hidden
        })
        .collect())
}

fn resolve_field<M: FormModel, R>(
    field: &Field<M, R>,
    model: &M,
) -> Result<ResolvedField<M, R>, FormError> {
    let Some(property) = field.property_field() else {
        return Ok(ResolvedField {
            field: field.clone(),
            descriptor: None,
            attributes: field.attributes().clone(),
        });
    };

    let Some(name) = property.name() else {
        return Ok(ResolvedField {
            field: field.clone(),
            descriptor: None,
            attributes: property.attributes.clone(),
        });
    };

    let descriptor = match model.property(name, property.shape) {
        Some(descriptor) => descriptor,
        None if property.shape.is_some() => {
            return Err(FormError::UnknownProperty {
                model: model.type_identifier().to_string(),
                field: name.to_string(),
            });
        }
        None => {
            return Err(FormError::UnresolvedType {
                field: name.to_string(),
            });
        }
    };

    Ok(ResolvedField {
        attributes: Attributes::merge(&property.attributes, descriptor.attributes()),
        field: field.clone(),
        descriptor: Some(descriptor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bag;

    crate::form_model! {
        #[derive(Debug, Default)]
        struct Profile {
            #[form(row = 1)]
            first: String,
            #[form(row = 1)]
            last: String,
            #[form(hidden)]
            secret: String,
        }
    }

    type TestField = Field<Profile, ()>;

    #[test]
    fn without_explicit_fields_every_visible_property_is_used() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let resolved = reconcile::<_, ()>(&[], &Profile::default())?;
        let names: Vec<_> = resolved.iter().filter_map(|f| f.name()).collect();
        assert_eq!(names, ["first", "last"]);
        Ok(())
    }

    #[test]
    fn explicit_fields_replace_enumeration() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let fields: Vec<TestField> = vec![
            PropertyField::new("last").row(3).into(),
            Field::generator(0, |_: &mut (), _| {}),
            PropertyField::placeholder().into(),
        ];
        let resolved = reconcile(&fields, &Profile::default())?;
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].name(), Some("last"));
        assert_eq!(resolved[0].attributes.row(), 3);
        assert!(resolved[1].descriptor.is_none());
        assert!(resolved[2].descriptor.is_none());
        Ok(())
    }

    #[test]
    fn explicit_hidden_property_is_dropped() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let fields: Vec<TestField> = vec![
            Field::property("secret"),
            PropertyField::new("first").attr(Attr::Hidden).into(),
        ];
        assert!(reconcile(&fields, &Profile::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_typed_property_is_an_error() {
        facet_form_testhelpers::setup();

        let untyped: Vec<TestField> = vec![Field::property("nickname")];
        assert!(matches!(
            reconcile(&untyped, &Profile::default()),
            Err(FormError::UnresolvedType { field }) if field == "nickname"
        ));

        let typed: Vec<TestField> = vec![PropertyField::new("nickname").typed::<String>().into()];
        assert!(matches!(
            reconcile(&typed, &Profile::default()),
            Err(FormError::UnknownProperty { model, .. }) if model == "Profile"
        ));
    }

    #[test]
    fn bag_fields_carry_their_declared_type() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let bag = Bag::new().with("x", 5);
        let fields: Vec<Field<Bag, ()>> = vec![
            PropertyField::new("x").typed::<i32>().read_only().into(),
            Field::property("y"),
        ];
        let resolved = reconcile(&fields, &bag)?;
        let x = resolved[0]
            .descriptor
            .as_ref()
            .ok_or_else(|| eyre::eyre!("x should be backed"))?;
        assert_eq!(x.shape(), Some(i32::SHAPE));
        assert!(resolved[0].attributes.is_read_only());
        // no type for y: that only fails once a widget is bound
        assert_eq!(resolved[1].descriptor.as_ref().and_then(|d| d.shape()), None);
        Ok(())
    }
}
