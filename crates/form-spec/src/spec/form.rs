use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolver::InvisibleFieldValidation;
use crate::spec::element::RawElement;

/// Form-wide options supplied next to the elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    #[serde(default)]
    pub invisible_field_validation: InvisibleFieldValidation,
    /// Error code to message template overrides, e.g.
    /// `{ "required": "Please fill in {{label}}" }`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, String>,
}

/// Full configuration document with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormDocument {
    pub elements: Vec<RawElement>,
    #[serde(default)]
    pub options: FormOptions,
}

/// Accepted configuration shapes: a bare element list or a [`FormDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ConfigDocument {
    Elements(Vec<RawElement>),
    Document(FormDocument),
}

impl ConfigDocument {
    pub fn elements(&self) -> &[RawElement] {
        match self {
            ConfigDocument::Elements(elements) => elements,
            ConfigDocument::Document(document) => &document.elements,
        }
    }

    pub fn options(&self) -> FormOptions {
        match self {
            ConfigDocument::Elements(_) => FormOptions::default(),
            ConfigDocument::Document(document) => document.options.clone(),
        }
    }
}

/// JSON Schema describing the configuration format.
pub fn configuration_schema() -> Value {
    schemars::schema_for!(ConfigDocument).to_value()
}
