#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod attribute;
pub use attribute::*;

mod shape;
pub use shape::*;

mod value;
pub use value::*;

mod impls;
pub use impls::*;

mod property;
pub use property::*;

mod resolve;
pub use resolve::*;

mod bag;
pub use bag::*;

mod binding;
pub use binding::{
    Binding, BindingMode, FieldIdentifier, ModelId, ValueReference, bind,
};

mod field;
pub use field::*;

mod layout;
pub use layout::*;

mod widget;
pub use widget::*;

mod validation;
pub use validation::*;

mod container;
pub use container::*;

mod options;
pub use options::*;

mod render;
pub use render::*;

mod error;
pub use error::*;

mod form;
pub use form::*;
