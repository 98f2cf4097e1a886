use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single structural problem found while validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Position of the offending element, e.g. `elements[0].children[2]`.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    /// Valid alternatives, when the violation is a failed lookup.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            field: None,
            message: message.into(),
            alternatives: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        self.alternatives = alternatives;
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(field) = &self.field {
            write!(f, " ({field})")?;
        }
        write!(f, ": {}", self.message)?;
        if !self.alternatives.is_empty() {
            write!(f, " (expected one of: {})", self.alternatives.join(", "))?;
        }
        Ok(())
    }
}

/// Setup-time failure; a configuration that produces this must not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse form configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid form configuration:\n{}", format_violations(.0))]
    Invalid(Vec<Violation>),
}

impl ConfigError {
    /// Violations carried by an [`ConfigError::Invalid`] error; empty otherwise.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ConfigError::Invalid(violations) => violations,
            ConfigError::Parse(_) => &[],
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("  - {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}
