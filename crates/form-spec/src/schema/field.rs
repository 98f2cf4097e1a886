use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::{FieldError, FieldErrors, ObjectSchema, ValidationContext, record};
use crate::messages::{self, MessageContext};
use crate::path;
use crate::spec::element::{Field, FieldShape, ValueKind};

static NULL: Value = Value::Null;

/// Base predicate derived from a field's structural shape.
#[derive(Debug, Clone)]
pub enum BaseType {
    Text,
    Number,
    Boolean,
    Choice {
        /// Allowed values; `None` when options come from an external provider.
        options: Option<Vec<Value>>,
        multiple: bool,
    },
    Repeating {
        item: Box<ObjectSchema>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    /// Delegates and unrecognised types accept any value.
    Any,
}

/// Leaf schema for a single field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub label: String,
    pub base: BaseType,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub message: Option<String>,
}

impl FieldSchema {
    pub fn from_field(field: &Field) -> Self {
        let base = match &field.shape {
            FieldShape::Generic => match field.value_kind() {
                ValueKind::Text => BaseType::Text,
                ValueKind::Number => BaseType::Number,
                ValueKind::Boolean => BaseType::Boolean,
                ValueKind::Any => BaseType::Any,
            },
            FieldShape::Choice(choice) => BaseType::Choice {
                options: match choice.options_provider {
                    Some(_) => None,
                    None => Some(
                        choice
                            .options
                            .iter()
                            .map(|option| option.value.clone())
                            .collect(),
                    ),
                },
                multiple: choice.multiple,
            },
            FieldShape::Repeating(repeating) => BaseType::Repeating {
                item: Box::new(ObjectSchema::from_fields(&repeating.item_fields)),
                min_items: repeating.min_items,
                max_items: repeating.max_items,
            },
            FieldShape::Delegate(_) => BaseType::Any,
        };

        let validation = field.validation.clone().unwrap_or_default();
        let pattern = validation
            .pattern
            .as_deref()
            .and_then(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    warn!(
                        field = %field.name,
                        %pattern,
                        error = %err,
                        "ignoring invalid validation pattern"
                    );
                    None
                }
            });

        FieldSchema {
            name: field.name.clone(),
            label: field.display_label().to_string(),
            base,
            required: validation.required,
            min_length: validation.min_length,
            max_length: validation.max_length,
            pattern,
            message: validation.message,
        }
    }

    pub(crate) fn validate(
        &self,
        value: Option<&Value>,
        path: &str,
        scope: &Value,
        ctx: &ValidationContext<'_>,
        errors: &mut FieldErrors,
    ) {
        if let Some(error) = self.check(value, path, scope, ctx, errors) {
            record(errors, path.to_string(), error);
        }
    }

    fn check(
        &self,
        value: Option<&Value>,
        path: &str,
        scope: &Value,
        ctx: &ValidationContext<'_>,
        errors: &mut FieldErrors,
    ) -> Option<FieldError> {
        let value = value.unwrap_or(&NULL);
        let message_ctx = MessageContext::new(&self.label, path);
        let fail = |code: &str, message_ctx: &MessageContext<'_>| {
            let message = ctx.messages.render(code, message_ctx);
            Some(FieldError::new(code, message))
        };

        match &self.base {
            BaseType::Text => match value {
                Value::Null => self.required_error(&message_ctx, ctx),
                Value::String(text) if text.is_empty() => self.required_error(&message_ctx, ctx),
                Value::String(text) => self.check_text(text, &message_ctx, ctx),
                _ => fail(messages::TYPE_MISMATCH, &message_ctx),
            },
            BaseType::Number => match value {
                Value::Null => self.required_error(&message_ctx, ctx),
                Value::String(text) if text.is_empty() => self.required_error(&message_ctx, ctx),
                Value::Number(_) => None,
                _ => fail(messages::TYPE_MISMATCH, &message_ctx),
            },
            BaseType::Boolean => match value {
                Value::Null | Value::Bool(false) => self.required_error(&message_ctx, ctx),
                Value::Bool(true) => None,
                _ => fail(messages::TYPE_MISMATCH, &message_ctx),
            },
            BaseType::Choice { options, multiple } => {
                if *multiple {
                    match value {
                        Value::Null => self.required_error(&message_ctx, ctx),
                        Value::Array(items) if items.is_empty() => {
                            self.required_error(&message_ctx, ctx)
                        }
                        Value::Array(items) => {
                            if items.iter().all(|item| allowed(options.as_deref(), item)) {
                                None
                            } else {
                                fail(messages::INVALID_OPTION, &message_ctx)
                            }
                        }
                        _ => fail(messages::TYPE_MISMATCH, &message_ctx),
                    }
                } else {
                    match value {
                        Value::Null => self.required_error(&message_ctx, ctx),
                        Value::String(text) if text.is_empty() => {
                            self.required_error(&message_ctx, ctx)
                        }
                        Value::Array(_) | Value::Object(_) => {
                            fail(messages::TYPE_MISMATCH, &message_ctx)
                        }
                        scalar if allowed(options.as_deref(), scalar) => None,
                        _ => fail(messages::INVALID_OPTION, &message_ctx),
                    }
                }
            }
            BaseType::Repeating {
                item,
                min_items,
                max_items,
            } => {
                let items: &[Value] = match value {
                    Value::Null => &[],
                    Value::Array(items) => items,
                    _ => return fail(messages::TYPE_MISMATCH, &message_ctx),
                };
                if items.is_empty()
                    && let Some(error) = self.required_error(&message_ctx, ctx)
                {
                    return Some(error);
                }
                if let Some(min) = min_items
                    && items.len() < *min
                {
                    return fail(messages::MIN_ITEMS, &message_ctx.clone().min(*min));
                }
                if let Some(max) = max_items
                    && items.len() > *max
                {
                    return fail(messages::MAX_ITEMS, &message_ctx.clone().max(*max));
                }
                for (index, entry) in items.iter().enumerate() {
                    let item_path = format!("{path}.{index}");
                    match entry {
                        Value::Object(_) => {
                            // Item keys shadow same-named keys of the enclosing scope.
                            let item_scope = path::deep_merge(scope, entry);
                            item.validate(Some(entry), &item_path, &item_scope, ctx, errors);
                        }
                        _ => {
                            let item_ctx = MessageContext::new(&self.label, &item_path);
                            let message = ctx.messages.render(messages::TYPE_MISMATCH, &item_ctx);
                            record(
                                errors,
                                item_path,
                                FieldError::new(messages::TYPE_MISMATCH, message),
                            );
                        }
                    }
                }
                None
            }
            BaseType::Any => match value {
                Value::Null => self.required_error(&message_ctx, ctx),
                Value::String(text) if text.is_empty() => self.required_error(&message_ctx, ctx),
                Value::String(text) => self.check_text(text, &message_ctx, ctx),
                _ => None,
            },
        }
    }

    fn required_error(
        &self,
        message_ctx: &MessageContext<'_>,
        ctx: &ValidationContext<'_>,
    ) -> Option<FieldError> {
        self.required.then(|| {
            FieldError::new(
                messages::REQUIRED,
                ctx.messages.render(messages::REQUIRED, message_ctx),
            )
        })
    }

    fn check_text(
        &self,
        text: &str,
        message_ctx: &MessageContext<'_>,
        ctx: &ValidationContext<'_>,
    ) -> Option<FieldError> {
        let length = text.chars().count();
        if let Some(min) = self.min_length
            && length < min
        {
            let message = ctx
                .messages
                .render(messages::MIN_LENGTH, &message_ctx.clone().min(min));
            return Some(FieldError::new(messages::MIN_LENGTH, message));
        }
        if let Some(max) = self.max_length
            && length > max
        {
            let message = ctx
                .messages
                .render(messages::MAX_LENGTH, &message_ctx.clone().max(max));
            return Some(FieldError::new(messages::MAX_LENGTH, message));
        }
        if let Some(pattern) = &self.pattern
            && !pattern.is_match(text)
        {
            let message = match &self.message {
                Some(template) => ctx.messages.render_custom(template, message_ctx),
                None => ctx.messages.render(messages::PATTERN, message_ctx),
            };
            return Some(FieldError::new(messages::PATTERN, message));
        }
        None
    }
}

fn allowed(options: Option<&[Value]>, value: &Value) -> bool {
    match options {
        Some(options) => options
            .iter()
            .any(|option| crate::rule::strict_eq(option, value)),
        None => true,
    }
}
