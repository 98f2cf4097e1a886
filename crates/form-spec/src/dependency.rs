//! Parent/dependent relations declared with `dependsOn`, and the resets they
//! trigger.
//!
//! Cascades resolve one level per call: resetting `city` after `country`
//! changed does not reset `district` (which depends on `city`) until the host
//! applies the reset and reports `city` as changed in turn.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::path;
use crate::spec::element::{Field, FieldShape, ValueKind};
use crate::spec::tree::ElementTree;

/// Parent field name to its dependents, in tree order.
pub type DependencyMap = BTreeMap<String, Vec<String>>;

/// Instruction to set `field` back to `value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reset {
    pub field: String,
    pub value: Value,
}

pub fn build_dependency_map(tree: &ElementTree) -> DependencyMap {
    let mut map = DependencyMap::new();
    for field in tree.fields() {
        if let Some(parent) = &field.depends_on {
            map.entry(parent.clone())
                .or_default()
                .push(field.name.clone());
        }
    }
    map
}

/// Resets owed to the direct dependents of `changed`.
///
/// The caller decides whether the parent's value actually changed; see
/// [`parent_changed`].
pub fn on_field_changed(changed: &str, tree: &ElementTree, map: &DependencyMap) -> Vec<Reset> {
    let Some(dependents) = map.get(changed) else {
        return Vec::new();
    };

    dependents
        .iter()
        .filter_map(|name| tree.field(name))
        .filter(|field| field.reset_on_parent_change)
        .map(|field| Reset {
            field: field.name.clone(),
            value: reset_value(field),
        })
        .collect()
}

/// Whether the raw value at `name` differs between two snapshots.
pub fn parent_changed(previous: &Value, current: &Value, name: &str) -> bool {
    path::get(previous, name) != path::get(current, name)
}

/// Value a field falls back to: its declared default, else a default
/// inferred from its shape.
pub fn reset_value(field: &Field) -> Value {
    if let Some(default) = &field.default_value {
        return default.clone();
    }
    structural_default(field)
}

/// Shape-derived empty value. A single-choice field uses `null` so "nothing
/// selected" stays distinct from an empty string.
pub fn structural_default(field: &Field) -> Value {
    match &field.shape {
        FieldShape::Repeating(_) => Value::Array(Vec::new()),
        FieldShape::Choice(choice) if choice.multiple => Value::Array(Vec::new()),
        FieldShape::Choice(_) => Value::Null,
        FieldShape::Generic if field.value_kind() == ValueKind::Boolean => Value::Bool(false),
        FieldShape::Generic | FieldShape::Delegate(_) => Value::String(String::new()),
    }
}

/// Returns a copy of `data` with every reset applied.
pub fn apply_resets(data: &Value, resets: &[Reset]) -> Value {
    let mut next = path::deep_clone(data);
    for reset in resets {
        path::set(&mut next, &reset.field, reset.value.clone());
    }
    next
}
