//! Rule interpreter for visibility and cross-field conditions.
//!
//! Rules use the JSON-logic encoding: every operation is an object with a
//! single key naming the operator, e.g. `{"==": [{"var": "country"}, "ua"]}`.
//! Evaluation is a pure function of the rule and the data; faults (unknown
//! operators, bad operands) evaluate to a falsy value and are logged.

mod registry;

use std::cmp::Ordering;
use std::slice;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::path;

pub use registry::{Operation, OperationRegistry, REGEX_MATCH, RegexMatch};

/// An opaque rule tree evaluated against form data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Rule(Value);

impl Rule {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Rule {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Evaluates rules with a fixed set of extension operations.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<OperationRegistry>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(OperationRegistry::with_defaults())
    }
}

impl Evaluator {
    pub fn new(registry: OperationRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Raw result of evaluating `rule` against `data`. Missing values are `null`.
    pub fn evaluate(&self, rule: &Rule, data: &Value) -> Value {
        self.eval(&rule.0, data)
    }

    /// Evaluates `rule` and coerces the result with [`truthy`].
    pub fn evaluate_bool(&self, rule: &Rule, data: &Value) -> bool {
        truthy(&self.evaluate(rule, data))
    }

    fn eval(&self, node: &Value, data: &Value) -> Value {
        match node {
            Value::Object(map) if map.len() == 1 => match map.iter().next() {
                Some((operator, args)) => self.apply(operator, args, data),
                None => Value::Null,
            },
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.eval(item, data)).collect())
            }
            literal => literal.clone(),
        }
    }

    fn apply(&self, operator: &str, args: &Value, data: &Value) -> Value {
        let operands = match args {
            Value::Array(items) => items.as_slice(),
            single => slice::from_ref(single),
        };
        let arg = |index: usize| {
            operands
                .get(index)
                .map(|operand| self.eval(operand, data))
                .unwrap_or(Value::Null)
        };

        match operator {
            "var" => {
                let key = arg(0);
                let found = match &key {
                    Value::Null => Some(data),
                    Value::String(path) => path::get(data, path),
                    Value::Number(index) => path::get(data, &index.to_string()),
                    _ => None,
                };
                match found {
                    Some(Value::Null) | None => arg(1),
                    Some(value) => value.clone(),
                }
            }
            "missing" => {
                let keys = match arg(0) {
                    Value::Array(keys) => keys,
                    _ => operands
                        .iter()
                        .map(|operand| self.eval(operand, data))
                        .collect(),
                };
                let missing = keys
                    .into_iter()
                    .filter(|key| {
                        key.as_str()
                            .map(|path| is_blank(path::get(data, path)))
                            .unwrap_or(false)
                    })
                    .collect();
                Value::Array(missing)
            }
            "==" => Value::Bool(loose_eq(&arg(0), &arg(1))),
            "!=" => Value::Bool(!loose_eq(&arg(0), &arg(1))),
            "===" => Value::Bool(strict_eq(&arg(0), &arg(1))),
            "!==" => Value::Bool(!strict_eq(&arg(0), &arg(1))),
            ">" => Value::Bool(compare(&arg(0), &arg(1)) == Some(Ordering::Greater)),
            ">=" => Value::Bool(matches!(
                compare(&arg(0), &arg(1)),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            "<" | "<=" => {
                let accept = |ordering: Option<Ordering>| match operator {
                    "<" => ordering == Some(Ordering::Less),
                    _ => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                };
                let (first, second) = (arg(0), arg(1));
                let mut result = accept(compare(&first, &second));
                if operands.len() >= 3 {
                    result = result && accept(compare(&second, &arg(2)));
                }
                Value::Bool(result)
            }
            "and" => {
                let mut last = Value::Bool(true);
                for operand in operands {
                    last = self.eval(operand, data);
                    if !truthy(&last) {
                        break;
                    }
                }
                last
            }
            "or" => {
                let mut last = Value::Bool(false);
                for operand in operands {
                    last = self.eval(operand, data);
                    if truthy(&last) {
                        break;
                    }
                }
                last
            }
            "!" | "not" => Value::Bool(!truthy(&arg(0))),
            "!!" => Value::Bool(truthy(&arg(0))),
            "if" => {
                let mut index = 0;
                while index + 1 < operands.len() {
                    if truthy(&self.eval(&operands[index], data)) {
                        return self.eval(&operands[index + 1], data);
                    }
                    index += 2;
                }
                if index < operands.len() {
                    self.eval(&operands[index], data)
                } else {
                    Value::Null
                }
            }
            "in" => {
                let needle = arg(0);
                let found = match (&needle, arg(1)) {
                    (Value::String(needle), Value::String(haystack)) => {
                        haystack.contains(needle.as_str())
                    }
                    (needle, Value::Array(items)) => {
                        items.iter().any(|item| strict_eq(needle, item))
                    }
                    _ => false,
                };
                Value::Bool(found)
            }
            custom => match self.registry.get(custom) {
                Some(operation) => {
                    let evaluated: Vec<Value> = operands
                        .iter()
                        .map(|operand| self.eval(operand, data))
                        .collect();
                    operation.apply(&evaluated)
                }
                None => {
                    warn!(operator = custom, "unknown rule operator");
                    Value::Null
                }
            },
        }
    }
}

/// Truthiness: `null`, `false`, `0`, `""` and empty collections are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if text.trim().is_empty() => Some(0.0),
        Value::String(text) => text.trim().parse().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Equality with numeric coercion between numbers, numeric strings and
/// booleans. `null` only equals `null`.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            left == right
        }
        _ => match (number_of(left), number_of(right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Equality without coercion; numbers compare by value (`1 === 1.0`).
pub fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Orders two values: strings lexicographically, everything numeric-like by
/// number. Mismatched or non-comparable values yield `None`.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => number_of(left)?.partial_cmp(&number_of(right)?),
    }
}

/// Builds a rule object `{operator: operands}`.
pub fn op(operator: &str, operands: Value) -> Rule {
    let mut map = Map::new();
    map.insert(operator.to_string(), operands);
    Rule(Value::Object(map))
}
