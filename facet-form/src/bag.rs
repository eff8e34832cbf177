use alloc::rc::Rc;

use indexmap::IndexMap;
use log::{debug, trace};

use crate::{FormModel, PropertyDescriptor, Shape, Value, ValueError};

/// An open model: string keys mapped to arbitrary values, in insertion order.
///
/// A bag has no static types. Fields bound to a key must declare the type they
/// expect; writes are checked against that declaration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bag {
    entries: IndexMap<String, Value>,
}

impl Bag {
    /// An empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, keeping the key's original position if it was
    /// already present
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style [`Bag::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Removes `key`, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn descriptor(key: &str, shape: Option<&'static Shape>) -> PropertyDescriptor<Bag> {
        let read_key = key.to_string();
        let write_key = key.to_string();
        PropertyDescriptor::synthetic(
            key.to_string(),
            shape,
            Rc::new(move |bag: &Bag| {
                Some(bag.get(&read_key).cloned().unwrap_or(Value::Null))
            }),
            Rc::new(move |bag: &mut Bag, value: Value| -> Result<(), ValueError> {
                let value = match shape {
                    Some(shape) => shape.coerce(value)?,
                    None => value,
                };
                trace!("Bag[{write_key}] = {value:?}");
                bag.entries.insert(write_key.clone(), value);
                Ok(())
            }),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = Bag::new();
        for (key, value) in iter {
            bag.insert(key, value);
        }
        bag
    }
}

impl FormModel for Bag {
    fn type_identifier(&self) -> &str {
        "Bag"
    }

    /// One descriptor per key; the type is guessed from the current value and
    /// stays unknown for `Null`s.
    fn resolve(&self) -> Vec<PropertyDescriptor<Self>> {
        debug!("Enumerating {} bag entries", self.entries.len());
        self.entries
            .iter()
            .map(|(key, value)| Bag::descriptor(key, value.shape()))
            .collect()
    }

    /// Always succeeds: a key that isn't there yet reads as `Null` and is
    /// created on first write.
    fn property(
        &self,
        name: &str,
        declared: Option<&'static Shape>,
    ) -> Option<PropertyDescriptor<Self>> {
        Some(Bag::descriptor(name, declared))
    }

    fn has_property(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn read(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldValue, FormError, ValueReference};

    #[test]
    fn enumeration_follows_insertion_order() {
        facet_form_testhelpers::setup();

        let bag = Bag::new()
            .with("zeta", 1)
            .with("alpha", "a")
            .with("mid", Value::Null);
        let properties = bag.resolve();
        let names: Vec<_> = properties.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(properties[0].shape(), Some(i64::SHAPE));
        assert_eq!(properties[1].shape(), Some(String::SHAPE));
        assert_eq!(properties[2].shape(), None);
        assert!(properties[2].reference().is_none());
    }

    #[test]
    fn writes_are_checked_against_the_declared_type() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let mut bag = Bag::new().with("x", 5);
        let x = bag
            .property("x", Some(u8::SHAPE))
            .ok_or_else(|| eyre::eyre!("bags always resolve"))?;

        x.set(&mut bag, Value::I64(7))?;
        assert_eq!(bag.get("x"), Some(&Value::U64(7)));

        let err = x.set(&mut bag, Value::I64(700)).unwrap_err();
        assert!(matches!(err, FormError::Value(ValueError::OutOfRange { .. })));
        assert_eq!(bag.get("x"), Some(&Value::U64(7)));
        Ok(())
    }

    #[test]
    fn keys_produce_synthetic_references() -> eyre::Result<()> {
        facet_form_testhelpers::setup();

        let bag = Bag::new();
        let missing = bag
            .property("missing", Some(bool::SHAPE))
            .ok_or_else(|| eyre::eyre!("bags always resolve"))?;
        assert!(missing.is_synthetic());
        assert_eq!(missing.get(&bag), Some(Value::Null));
        assert_eq!(
            missing.reference(),
            Some(ValueReference::Key {
                key: "missing".into(),
                shape: bool::SHAPE,
            })
        );
        assert!(!bag.has_property("missing"));
        Ok(())
    }
}
