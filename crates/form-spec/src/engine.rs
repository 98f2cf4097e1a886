use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::dependency::{self, DependencyMap, Reset};
use crate::error::ConfigError;
use crate::messages::MessageCatalog;
use crate::path;
use crate::resolver::{self, InvisibleFieldValidation};
use crate::rule::{Evaluator, OperationRegistry};
use crate::schema::{self, FieldErrors, Validator};
use crate::spec::form::{ConfigDocument, FormOptions};
use crate::spec::tree::{ComponentCatalog, ElementTree};
use crate::visibility::{VisibilityState, calculate_visibility};

/// Result of feeding a data snapshot to the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataChange {
    pub visibility: VisibilityState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

/// Everything derived once from a configuration: the tree, its validator,
/// dependency map and options. Holds no per-session state.
#[derive(Debug, Clone)]
pub struct FormEngine {
    tree: ElementTree,
    validator: Validator,
    dependencies: DependencyMap,
    evaluator: Evaluator,
    options: FormOptions,
}

impl FormEngine {
    pub fn new(tree: ElementTree, options: FormOptions, registry: OperationRegistry) -> Self {
        let evaluator = Evaluator::new(registry);
        let messages = MessageCatalog::new(&options.messages);
        let validator = schema::generate_with_messages(&tree, &evaluator, messages);
        let dependencies = dependency::build_dependency_map(&tree);
        debug!(
            fields = tree.fields().len(),
            parents = dependencies.len(),
            "form engine ready"
        );
        Self {
            tree,
            validator,
            dependencies,
            evaluator,
            options,
        }
    }

    /// Parses and validates a configuration document with the default
    /// operation registry.
    pub fn from_value(config: &Value) -> Result<Self, ConfigError> {
        Self::from_value_with(config, OperationRegistry::with_defaults(), None)
    }

    pub fn from_value_with(
        config: &Value,
        registry: OperationRegistry,
        catalog: Option<&dyn ComponentCatalog>,
    ) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_value(config.clone())?;
        let tree = match catalog {
            Some(catalog) => ElementTree::from_elements_with_catalog(document.elements(), catalog)?,
            None => ElementTree::from_elements(document.elements())?,
        };
        Ok(Self::new(tree, document.options(), registry))
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn dependencies(&self) -> &DependencyMap {
        &self.dependencies
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn policy(&self) -> InvisibleFieldValidation {
        self.options.invisible_field_validation
    }

    pub fn visibility(&self, data: &Value) -> VisibilityState {
        calculate_visibility(&self.tree, data, &self.evaluator)
    }

    /// Validates `data` against the visibility computed from the same data.
    pub fn resolve(&self, data: &Value) -> FieldErrors {
        let visibility = self.visibility(data);
        resolver::resolve(data, &self.validator, &visibility, self.policy())
    }

    /// Recomputes visibility for `data`, and errors when `validate` is set.
    pub fn on_data_changed(&self, data: &Value, validate: bool) -> DataChange {
        let visibility = self.visibility(data);
        let errors = validate
            .then(|| resolver::resolve(data, &self.validator, &visibility, self.policy()));
        DataChange { visibility, errors }
    }

    /// Direct dependents of `changed` to reset, or nothing when its value is
    /// the same in both snapshots. Call again for each applied reset to walk
    /// longer chains.
    pub fn on_field_changed(&self, changed: &str, previous: &Value, current: &Value) -> Vec<Reset> {
        if !dependency::parent_changed(previous, current, changed) {
            return Vec::new();
        }
        dependency::on_field_changed(changed, &self.tree, &self.dependencies)
    }

    pub fn apply_resets(&self, data: &Value, resets: &[Reset]) -> Value {
        dependency::apply_resets(data, resets)
    }

    /// Starting data: each field's default (declared or structural), with
    /// `overrides` deep-merged on top.
    pub fn initial_data(&self, overrides: &Value) -> Value {
        let mut defaults = Value::Object(Map::new());
        for field in self.tree.fields() {
            path::set(&mut defaults, &field.name, dependency::reset_value(field));
        }
        match overrides {
            Value::Null => defaults,
            overrides => path::deep_merge(&defaults, overrides),
        }
    }
}
