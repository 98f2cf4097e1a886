use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rule::Evaluator;
use crate::schema::{FieldErrors, Severity, Validator};
use crate::spec::tree::ElementTree;
use crate::visibility::{VisibilityState, calculate_visibility, is_path_visible};

/// How errors of currently hidden fields are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvisibleFieldValidation {
    /// Drop errors of hidden fields.
    #[default]
    Skip,
    /// Report every error regardless of visibility.
    Validate,
    /// Keep errors of hidden fields, downgraded to warnings.
    Warn,
}

/// Supplies the visibility in effect at the moment errors are resolved.
pub trait VisibilitySource {
    fn current(&self) -> Cow<'_, VisibilityState>;
}

impl VisibilitySource for VisibilityState {
    fn current(&self) -> Cow<'_, VisibilityState> {
        Cow::Borrowed(self)
    }
}

impl<F> VisibilitySource for F
where
    F: Fn() -> VisibilityState,
{
    fn current(&self) -> Cow<'_, VisibilityState> {
        Cow::Owned(self())
    }
}

/// Computes visibility from the tree and data each time it is asked.
#[derive(Debug, Clone, Copy)]
pub struct LiveVisibility<'a> {
    pub tree: &'a ElementTree,
    pub data: &'a Value,
    pub evaluator: &'a Evaluator,
}

impl VisibilitySource for LiveVisibility<'_> {
    fn current(&self) -> Cow<'_, VisibilityState> {
        Cow::Owned(calculate_visibility(self.tree, self.data, self.evaluator))
    }
}

/// Runs `validator` over `data` and applies `policy` to errors of hidden
/// fields. Fields missing from the visibility state count as visible.
pub fn resolve(
    data: &Value,
    validator: &Validator,
    visibility: &dyn VisibilitySource,
    policy: InvisibleFieldValidation,
) -> FieldErrors {
    let raw = validator.validate(data);
    if policy == InvisibleFieldValidation::Validate {
        return raw;
    }

    let visibility = visibility.current();
    filter_errors(raw, &visibility, policy)
}

/// Applies `policy` to already computed errors.
pub fn filter_errors(
    errors: FieldErrors,
    visibility: &VisibilityState,
    policy: InvisibleFieldValidation,
) -> FieldErrors {
    match policy {
        InvisibleFieldValidation::Validate => errors,
        InvisibleFieldValidation::Skip => errors
            .into_iter()
            .filter(|(path, _)| is_path_visible(visibility, path))
            .collect(),
        InvisibleFieldValidation::Warn => errors
            .into_iter()
            .map(|(path, mut error)| {
                if !is_path_visible(visibility, &path) {
                    error.severity = Severity::Warning;
                }
                (path, error)
            })
            .collect(),
    }
}
