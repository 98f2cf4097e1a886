#![allow(missing_docs)]

pub mod dependency;
pub mod engine;
pub mod error;
pub mod messages;
pub mod path;
pub mod resolver;
pub mod rule;
pub mod schema;
pub mod spec;
pub mod visibility;

pub use dependency::{
    DependencyMap, Reset, apply_resets, build_dependency_map, on_field_changed, parent_changed,
    reset_value,
};
pub use engine::{DataChange, FormEngine};
pub use error::{ConfigError, Violation};
pub use messages::{MessageCatalog, MessageContext};
pub use resolver::{InvisibleFieldValidation, LiveVisibility, VisibilitySource, resolve};
pub use rule::{Evaluator, Operation, OperationRegistry, Rule, truthy};
pub use schema::{FieldError, FieldErrors, Severity, Validator, generate};
pub use spec::{
    ComponentCatalog, ConfigDocument, ElementNode, ElementTree, Field, FieldShape, FormDocument,
    FormOptions, RawElement, ValidationConfig, configuration_schema,
};
pub use visibility::{VisibilityState, calculate_visibility};
