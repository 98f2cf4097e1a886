//! Whole-form validator generated once from an element tree.
//!
//! Field names with dots produce nested object schemas, so the validator runs
//! against the same nested data shape as the rest of the engine. Errors are
//! keyed by dot-path; each path keeps its first error.

mod field;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::messages::{self, MessageCatalog, MessageContext};
use crate::path;
use crate::rule::{Evaluator, Rule};
use crate::spec::element::Field;
use crate::spec::tree::ElementTree;

pub use field::{BaseType, FieldSchema};

/// Whether an error blocks submission or is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
}

impl FieldError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Errors keyed by dot-path into the form data.
pub type FieldErrors = BTreeMap<String, FieldError>;

/// Inserts `error` unless `path` already holds one.
pub(crate) fn record(errors: &mut FieldErrors, path: String, error: FieldError) {
    errors.entry(path).or_insert(error);
}

#[derive(Debug, Clone)]
pub(crate) enum SchemaNode {
    Object(ObjectSchema),
    Leaf(FieldSchema),
}

/// Schema for one object level plus the conditions scoped to it.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    pub(crate) properties: BTreeMap<String, SchemaNode>,
    pub(crate) conditions: Vec<ConditionCheck>,
}

#[derive(Debug, Clone)]
pub(crate) struct ConditionCheck {
    /// Path relative to the scope the condition is evaluated in.
    path: String,
    label: String,
    rule: Rule,
    message: Option<String>,
}

impl ObjectSchema {
    /// Builds a schema for `fields`, nesting dotted names.
    pub(crate) fn from_fields<'a>(fields: impl IntoIterator<Item = &'a Field>) -> Self {
        let mut schema = ObjectSchema::default();
        for field in fields {
            schema.insert(&field.name, FieldSchema::from_field(field));
            if let Some(validation) = &field.validation
                && let Some(condition) = &validation.condition
            {
                schema.conditions.push(ConditionCheck {
                    path: field.name.clone(),
                    label: field.display_label().to_string(),
                    rule: condition.clone(),
                    message: validation.message.clone(),
                });
            }
        }
        schema
    }

    /// Leaf schema at a dotted path, following nested object schemas.
    pub fn field(&self, path: &str) -> Option<&FieldSchema> {
        match path.split_once('.') {
            Some((head, rest)) => self.object(head)?.field(rest),
            None => match self.properties.get(path)? {
                SchemaNode::Leaf(leaf) => Some(leaf),
                SchemaNode::Object(_) => None,
            },
        }
    }

    /// Nested object schema stored under `key`.
    pub fn object(&self, key: &str) -> Option<&ObjectSchema> {
        match self.properties.get(key)? {
            SchemaNode::Object(object) => Some(object),
            SchemaNode::Leaf(_) => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    fn insert(&mut self, name: &str, leaf: FieldSchema) {
        let (head, rest) = match name.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name, None),
        };
        match rest {
            None => {
                if self.properties.contains_key(head) {
                    warn!(field = name, "field schema replaces an existing nested schema");
                }
                self.properties.insert(head.to_string(), SchemaNode::Leaf(leaf));
            }
            Some(rest) => {
                let node = self
                    .properties
                    .entry(head.to_string())
                    .or_insert_with(|| SchemaNode::Object(ObjectSchema::default()));
                if matches!(node, SchemaNode::Leaf(_)) {
                    warn!(field = name, "nested field schema replaces an existing field");
                    *node = SchemaNode::Object(ObjectSchema::default());
                }
                if let SchemaNode::Object(object) = node {
                    object.insert(rest, leaf);
                }
            }
        }
    }

    pub(crate) fn validate(
        &self,
        value: Option<&Value>,
        prefix: &str,
        scope: &Value,
        ctx: &ValidationContext<'_>,
        errors: &mut FieldErrors,
    ) {
        let object = value.and_then(Value::as_object);
        for (key, node) in &self.properties {
            let child_path = path::join(prefix, key);
            let child = object.and_then(|map| map.get(key));
            match node {
                SchemaNode::Leaf(leaf) => leaf.validate(child, &child_path, scope, ctx, errors),
                SchemaNode::Object(nested) => match child {
                    None | Some(Value::Null) | Some(Value::Object(_)) => {
                        nested.validate(child, &child_path, scope, ctx, errors)
                    }
                    Some(_) => {
                        let message_ctx = MessageContext::new(key, &child_path);
                        let message = ctx.messages.render(messages::TYPE_MISMATCH, &message_ctx);
                        record(
                            errors,
                            child_path,
                            FieldError::new(messages::TYPE_MISMATCH, message),
                        );
                    }
                },
            }
        }

        for check in &self.conditions {
            if ctx.evaluator.evaluate_bool(&check.rule, scope) {
                continue;
            }
            let error_path = path::join(prefix, &check.path);
            let message_ctx = MessageContext::new(&check.label, &error_path);
            let message = match &check.message {
                Some(template) => ctx.messages.render_custom(template, &message_ctx),
                None => ctx.messages.render(messages::CONDITION, &message_ctx),
            };
            let error = FieldError::new(messages::CONDITION, message);
            record(errors, error_path, error);
        }
    }
}

pub(crate) struct ValidationContext<'a> {
    pub(crate) evaluator: &'a Evaluator,
    pub(crate) messages: &'a MessageCatalog,
}

/// Composed validator for a whole form.
#[derive(Debug, Clone)]
pub struct Validator {
    root: ObjectSchema,
    evaluator: Evaluator,
    messages: Arc<MessageCatalog>,
}

impl Validator {
    /// Validates `data` and returns every error by path. Cross-field
    /// conditions run against the complete snapshot, each failing one
    /// reporting at its own field.
    pub fn validate(&self, data: &Value) -> FieldErrors {
        let ctx = ValidationContext {
            evaluator: &self.evaluator,
            messages: &self.messages,
        };
        let mut errors = FieldErrors::new();
        self.root.validate(Some(data), "", data, &ctx, &mut errors);
        errors
    }

    pub fn is_valid(&self, data: &Value) -> bool {
        self.validate(data).is_empty()
    }

    pub fn root(&self) -> &ObjectSchema {
        &self.root
    }
}

/// Generates the validator for `tree` using the default message templates.
pub fn generate(tree: &ElementTree, evaluator: &Evaluator) -> Validator {
    generate_with_messages(tree, evaluator, MessageCatalog::default())
}

pub fn generate_with_messages(
    tree: &ElementTree,
    evaluator: &Evaluator,
    messages: MessageCatalog,
) -> Validator {
    Validator {
        root: ObjectSchema::from_fields(tree.fields()),
        evaluator: evaluator.clone(),
        messages: Arc::new(messages),
    }
}
