use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// A named extension operation. Receives already-evaluated operands.
pub trait Operation: Send + Sync {
    fn apply(&self, args: &[Value]) -> Value;
}

impl<F> Operation for F
where
    F: Fn(&[Value]) -> Value + Send + Sync,
{
    fn apply(&self, args: &[Value]) -> Value {
        self(args)
    }
}

/// Custom operations available to an [`Evaluator`](super::Evaluator).
///
/// Built-in operators (`var`, `==`, `and`, ...) are always handled by the
/// evaluator itself and cannot be shadowed here.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    /// An empty registry without any extension.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the extensions every form engine ships with.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(REGEX_MATCH, RegexMatch);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, operation: impl Operation + 'static) {
        self.operations.insert(name.into(), Arc::new(operation));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Operation>> {
        self.operations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("operations", &self.names())
            .finish()
    }
}

pub const REGEX_MATCH: &str = "regex_match";

/// `regex_match(pattern, value)`: true iff `value` is a string matching
/// `pattern`. Bad patterns and non-string values yield `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMatch;

impl Operation for RegexMatch {
    fn apply(&self, args: &[Value]) -> Value {
        let (Some(Value::String(pattern)), Some(Value::String(text))) = (args.first(), args.get(1))
        else {
            return Value::Bool(false);
        };
        match Regex::new(pattern) {
            Ok(regex) => Value::Bool(regex.is_match(text)),
            Err(err) => {
                warn!(%pattern, error = %err, "regex_match received an invalid pattern");
                Value::Bool(false)
            }
        }
    }
}
