pub mod element;
pub mod form;
pub mod tree;
pub mod validation;

pub use element::{
    ChoiceOption, ChoiceShape, Container, DelegateShape, ElementNode, Field, FieldShape,
    RawElement, RepeatingShape, ValueKind,
};
pub use form::{ConfigDocument, FormDocument, FormOptions, configuration_schema};
pub use tree::{ComponentCatalog, ElementTree};
pub use validation::ValidationConfig;
