use serde_json::Value;

use crate::rule::Evaluator;
use crate::spec::element::ElementNode;
use crate::spec::tree::ElementTree;

/// Field name to visible flag, recomputed wholesale from the tree and data.
pub type VisibilityState = std::collections::BTreeMap<String, bool>;

/// Computes visibility for every field in `tree`.
///
/// A hidden container hides all of its descendants; their own rules are not
/// evaluated. Elements without a `visible` rule are visible unless an ancestor
/// is hidden.
pub fn calculate_visibility(
    tree: &ElementTree,
    data: &Value,
    evaluator: &Evaluator,
) -> VisibilityState {
    let mut state = VisibilityState::new();
    visit(tree.roots(), data, evaluator, true, &mut state);
    state
}

fn visit(
    nodes: &[ElementNode],
    data: &Value,
    evaluator: &Evaluator,
    parent_visible: bool,
    state: &mut VisibilityState,
) {
    for node in nodes {
        match node {
            ElementNode::Field(field) => {
                let visible = parent_visible
                    && field
                        .visible
                        .as_ref()
                        .map(|rule| evaluator.evaluate_bool(rule, data))
                        .unwrap_or(true);
                state.insert(field.name.clone(), visible);
            }
            ElementNode::Container(container) => {
                let visible = parent_visible
                    && container
                        .visible
                        .as_ref()
                        .map(|rule| evaluator.evaluate_bool(rule, data))
                        .unwrap_or(true);
                visit(&container.children, data, evaluator, visible, state);
            }
        }
    }
}

/// Whether `path` is visible, resolving nested data paths (such as
/// `items.0.name`) to the closest field that owns them. Paths not covered by
/// `state` count as visible.
pub fn is_path_visible(state: &VisibilityState, path: &str) -> bool {
    let mut candidate = path;
    loop {
        if let Some(visible) = state.get(candidate) {
            return *visible;
        }
        match candidate.rfind('.') {
            Some(index) => candidate = &candidate[..index],
            None => return true,
        }
    }
}
