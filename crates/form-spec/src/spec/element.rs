use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::rule::Rule;
use crate::spec::validation::ValidationConfig;

/// Reserved type string for layout containers.
pub const CONTAINER_TYPE: &str = "container";

pub(crate) const CHOICE_TYPES: &[&str] = &["select", "radio", "multiselect", "autocomplete"];
pub(crate) const REPEATING_TYPES: &[&str] = &["array", "repeater"];
pub(crate) const DELEGATE_TYPES: &[&str] = &["custom"];

const BOOLEAN_TYPES: &[&str] = &["checkbox", "switch", "toggle", "boolean"];
const NUMBER_TYPES: &[&str] = &["number", "integer", "range"];
const TEXT_TYPES: &[&str] = &[
    "text", "textarea", "string", "email", "password", "tel", "url", "search", "date", "time",
    "datetime", "color",
];

/// One element of a configuration exactly as authored, before validation.
///
/// Unknown keys are kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawElement {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Value>")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_on_parent_change: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    /// Name of an external provider that supplies options at runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_fields: Option<Vec<RawElement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_props: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RawElement>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Keeps an explicit `null` as `Some(Value::Null)` instead of collapsing it.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A value/label pair offered by a choice field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceOption {
    pub value: Value,
    #[serde(default)]
    pub label: String,
}

/// A validated node of the element tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementNode {
    Field(Field),
    Container(Container),
}

/// A layout node grouping other elements; it never carries data itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub variant: Option<String>,
    pub children: Vec<ElementNode>,
    pub visible: Option<Rule>,
    pub meta: Option<Map<String, Value>>,
}

impl Container {
    /// Key used by an external layout registry to pick a renderer.
    pub fn render_key(&self) -> &str {
        self.variant.as_deref().unwrap_or(CONTAINER_TYPE)
    }
}

/// A data-bearing element. `name` is a dot-path into the form data.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub kind: String,
    pub name: String,
    pub label: Option<String>,
    pub default_value: Option<Value>,
    pub validation: Option<ValidationConfig>,
    pub visible: Option<Rule>,
    pub depends_on: Option<String>,
    pub reset_on_parent_change: bool,
    pub meta: Option<Map<String, Value>>,
    pub shape: FieldShape,
    pub extra: Map<String, Value>,
}

/// Structural specialisation of a field, decided by its declared attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    Generic,
    Choice(ChoiceShape),
    Repeating(RepeatingShape),
    Delegate(DelegateShape),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceShape {
    pub options: Vec<ChoiceOption>,
    pub multiple: bool,
    pub options_provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatingShape {
    pub item_fields: Vec<Field>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelegateShape {
    pub component: String,
    pub component_props: Option<Map<String, Value>>,
}

/// Value family of a generic field, derived from its type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Number,
    Boolean,
    /// Unrecognised type strings accept any value.
    Any,
}

impl ValueKind {
    pub fn from_type(kind: &str) -> Self {
        if TEXT_TYPES.contains(&kind) {
            ValueKind::Text
        } else if NUMBER_TYPES.contains(&kind) {
            ValueKind::Number
        } else if BOOLEAN_TYPES.contains(&kind) {
            ValueKind::Boolean
        } else {
            ValueKind::Any
        }
    }
}

impl Field {
    /// Human label used in messages; falls back to the field name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Key used by an external registry to pick a renderer.
    pub fn render_key(&self) -> &str {
        match &self.shape {
            FieldShape::Delegate(delegate) => &delegate.component,
            _ => &self.kind,
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        ValueKind::from_type(&self.kind)
    }

    pub fn shape_name(&self) -> &'static str {
        match self.shape {
            FieldShape::Generic => "generic",
            FieldShape::Choice(_) => "choice",
            FieldShape::Repeating(_) => "repeating",
            FieldShape::Delegate(_) => "delegate",
        }
    }

    pub fn is_required(&self) -> bool {
        self.validation
            .as_ref()
            .map(|validation| validation.required)
            .unwrap_or(false)
    }
}
