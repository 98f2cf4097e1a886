use std::collections::BTreeMap;

use handlebars::{Handlebars, no_escape};
use serde::Serialize;
use tracing::warn;

pub const REQUIRED: &str = "required";
pub const TYPE_MISMATCH: &str = "type_mismatch";
pub const MIN_LENGTH: &str = "min_length";
pub const MAX_LENGTH: &str = "max_length";
pub const PATTERN: &str = "pattern";
pub const INVALID_OPTION: &str = "invalid_option";
pub const MIN_ITEMS: &str = "min_items";
pub const MAX_ITEMS: &str = "max_items";
pub const CONDITION: &str = "condition";

const DEFAULTS: &[(&str, &str)] = &[
    (REQUIRED, "{{label}} is required"),
    (TYPE_MISMATCH, "{{label}} has an unexpected value type"),
    (MIN_LENGTH, "{{label}} must be at least {{min}} characters"),
    (MAX_LENGTH, "{{label}} must be at most {{max}} characters"),
    (PATTERN, "{{label}} has an invalid format"),
    (INVALID_OPTION, "{{label}} must be one of the available options"),
    (MIN_ITEMS, "{{label}} must contain at least {{min}} items"),
    (MAX_ITEMS, "{{label}} must contain at most {{max}} items"),
    (CONDITION, "{{label}} is invalid"),
];

/// Values available to message templates.
#[derive(Debug, Clone, Serialize)]
pub struct MessageContext<'a> {
    pub label: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl<'a> MessageContext<'a> {
    pub fn new(label: &'a str, name: &'a str) -> Self {
        Self {
            label,
            name,
            min: None,
            max: None,
        }
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }
}

/// Error-message templates keyed by error code.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    registry: Handlebars<'static>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}

impl MessageCatalog {
    /// Built-in templates with `overrides` applied on top. Overrides that fail
    /// to compile are ignored.
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);

        for &(code, template) in DEFAULTS {
            if let Err(err) = registry.register_template_string(code, template) {
                warn!(code, error = %err, "built-in message template failed to compile");
            }
        }
        for (code, template) in overrides {
            if let Err(err) = registry.register_template_string(code, template) {
                warn!(code = %code, error = %err, "ignoring invalid message template override");
            }
        }

        Self { registry }
    }

    /// Renders the template registered for `code`.
    pub fn render(&self, code: &str, ctx: &MessageContext<'_>) -> String {
        match self.registry.render(code, ctx) {
            Ok(message) => message,
            Err(err) => {
                warn!(code, error = %err, "failed to render message template");
                format!("{} is invalid", ctx.label)
            }
        }
    }

    /// Renders an ad-hoc template such as a field's configured message. The
    /// raw text is returned when it is not a valid template.
    pub fn render_custom(&self, template: &str, ctx: &MessageContext<'_>) -> String {
        self.registry
            .render_template(template, ctx)
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to render custom message; using it verbatim");
                template.to_string()
            })
    }
}
