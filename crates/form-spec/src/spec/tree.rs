use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, Violation};
use crate::spec::element::{
    CHOICE_TYPES, CONTAINER_TYPE, ChoiceShape, Container, DELEGATE_TYPES, DelegateShape,
    ElementNode, Field, FieldShape, REPEATING_TYPES, RawElement, RepeatingShape,
};
use crate::spec::form::ConfigDocument;

/// Lookup of delegate component names owned by the host.
pub trait ComponentCatalog {
    fn contains(&self, component: &str) -> bool;
    fn names(&self) -> Vec<String>;
}

impl ComponentCatalog for BTreeSet<String> {
    fn contains(&self, component: &str) -> bool {
        BTreeSet::contains(self, component)
    }

    fn names(&self) -> Vec<String> {
        self.iter().cloned().collect()
    }
}

impl<T> ComponentCatalog for BTreeMap<String, T> {
    fn contains(&self, component: &str) -> bool {
        self.contains_key(component)
    }

    fn names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}

impl<T> ComponentCatalog for HashMap<String, T> {
    fn contains(&self, component: &str) -> bool {
        self.contains_key(component)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Validated, immutable element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementTree {
    roots: Vec<ElementNode>,
}

impl ElementTree {
    /// Parses a configuration document (bare element list or
    /// `{ "elements": [...] }`) and validates it.
    pub fn from_value(config: &Value) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_value(config.clone())?;
        Self::from_elements(document.elements())
    }

    /// Like [`ElementTree::from_value`], additionally checking delegate
    /// component names against `catalog`.
    pub fn from_value_with_catalog(
        config: &Value,
        catalog: &dyn ComponentCatalog,
    ) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_value(config.clone())?;
        Self::build(document.elements(), Some(catalog))
    }

    pub fn from_elements(elements: &[RawElement]) -> Result<Self, ConfigError> {
        Self::build(elements, None)
    }

    pub fn from_elements_with_catalog(
        elements: &[RawElement],
        catalog: &dyn ComponentCatalog,
    ) -> Result<Self, ConfigError> {
        Self::build(elements, Some(catalog))
    }

    fn build(
        elements: &[RawElement],
        catalog: Option<&dyn ComponentCatalog>,
    ) -> Result<Self, ConfigError> {
        let mut builder = TreeBuilder {
            catalog,
            violations: Vec::new(),
        };

        if elements.is_empty() {
            builder.violations.push(Violation::new(
                "elements",
                "configuration must declare at least one element",
            ));
        }

        let roots = elements
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| builder.node(raw, &format!("elements[{index}]")))
            .collect::<Vec<_>>();
        let tree = ElementTree { roots };

        if builder.violations.is_empty() {
            tree.check_names(&mut builder.violations);
            tree.check_dependencies(&mut builder.violations);
        }

        if builder.violations.is_empty() {
            Ok(tree)
        } else {
            debug!(
                violations = builder.violations.len(),
                "rejected form configuration"
            );
            Err(ConfigError::Invalid(builder.violations))
        }
    }

    pub fn roots(&self) -> &[ElementNode] {
        &self.roots
    }

    /// Every field in depth-first pre-order. Fields nested inside a repeating
    /// field's `item_fields` are not included.
    pub fn fields(&self) -> Vec<&Field> {
        let mut fields = Vec::new();
        collect_fields(&self.roots, &mut fields);
        fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().into_iter().find(|field| field.name == name)
    }

    fn check_names(&self, violations: &mut Vec<Violation>) {
        let fields = self.fields();
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                violations.push(
                    Violation::new("elements", "field name is declared more than once")
                        .with_field(&field.name),
                );
            }
        }
        for field in &fields {
            let prefix = format!("{}.", field.name);
            if let Some(nested) = seen.iter().find(|name| name.starts_with(&prefix)) {
                violations.push(
                    Violation::new(
                        "elements",
                        format!("field value cannot also hold nested field '{nested}'"),
                    )
                    .with_field(&field.name),
                );
            }
        }
    }

    fn check_dependencies(&self, violations: &mut Vec<Violation>) {
        let fields = self.fields();
        let parents: BTreeMap<&str, &str> = fields
            .iter()
            .filter_map(|field| Some((field.name.as_str(), field.depends_on.as_deref()?)))
            .collect();

        for (child, parent) in &parents {
            if child == parent {
                violations.push(
                    Violation::new("elements", "field cannot depend on itself").with_field(*child),
                );
                continue;
            }
            if !fields.iter().any(|field| field.name == *parent) {
                violations.push(
                    Violation::new(
                        "elements",
                        format!("dependsOn references unknown field '{parent}'"),
                    )
                    .with_field(*child),
                );
                continue;
            }

            let mut cursor = *parent;
            for _ in 0..parents.len() {
                match parents.get(cursor) {
                    Some(next) if next == child => {
                        violations.push(
                            Violation::new("elements", "dependsOn chain forms a cycle")
                                .with_field(*child),
                        );
                        break;
                    }
                    Some(next) => cursor = *next,
                    None => break,
                }
            }
        }
    }
}

fn collect_fields<'a>(nodes: &'a [ElementNode], out: &mut Vec<&'a Field>) {
    for node in nodes {
        match node {
            ElementNode::Field(field) => out.push(field),
            ElementNode::Container(container) => collect_fields(&container.children, out),
        }
    }
}

struct TreeBuilder<'c> {
    catalog: Option<&'c dyn ComponentCatalog>,
    violations: Vec<Violation>,
}

impl TreeBuilder<'_> {
    fn node(&mut self, raw: &RawElement, path: &str) -> Option<ElementNode> {
        let kind = match raw.kind.as_deref().map(str::trim) {
            Some(kind) if !kind.is_empty() => kind,
            _ => {
                self.violations
                    .push(Violation::new(path, "element is missing a non-empty `type`"));
                return None;
            }
        };

        if kind == CONTAINER_TYPE {
            let children = raw
                .children
                .as_deref()
                .unwrap_or_default()
                .iter()
                .enumerate()
                .filter_map(|(index, child)| self.node(child, &format!("{path}.children[{index}]")))
                .collect();
            return Some(ElementNode::Container(Container {
                variant: raw.variant.clone(),
                children,
                visible: raw.visible.clone(),
                meta: raw.meta.clone(),
            }));
        }

        self.field(raw, kind, path).map(ElementNode::Field)
    }

    fn field(&mut self, raw: &RawElement, kind: &str, path: &str) -> Option<Field> {
        let name = match raw.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                self.violations
                    .push(Violation::new(path, "field is missing a non-empty `name`"));
                return None;
            }
        };

        let shape = self.shape(raw, kind, &name, path)?;

        Some(Field {
            kind: kind.to_string(),
            name,
            label: raw.label.clone(),
            default_value: raw.default_value.clone(),
            validation: raw.validation.clone(),
            visible: raw.visible.clone(),
            depends_on: raw.depends_on.clone(),
            reset_on_parent_change: raw.reset_on_parent_change.unwrap_or(true),
            meta: raw.meta.clone(),
            shape,
            extra: raw.extra.clone(),
        })
    }

    fn shape(
        &mut self,
        raw: &RawElement,
        kind: &str,
        name: &str,
        path: &str,
    ) -> Option<FieldShape> {
        if raw.component.is_some() || DELEGATE_TYPES.contains(&kind) {
            let Some(component) = raw.component.clone() else {
                self.violations.push(
                    Violation::new(path, "delegate field requires `component`").with_field(name),
                );
                return None;
            };
            if let Some(catalog) = self.catalog
                && !catalog.contains(&component)
            {
                self.violations.push(
                    Violation::new(path, format!("unknown component '{component}'"))
                        .with_field(name)
                        .with_alternatives(catalog.names()),
                );
                return None;
            }
            return Some(FieldShape::Delegate(DelegateShape {
                component,
                component_props: raw.component_props.clone(),
            }));
        }

        if raw.item_fields.is_some() || REPEATING_TYPES.contains(&kind) {
            let Some(raw_items) = raw.item_fields.as_deref() else {
                self.violations.push(
                    Violation::new(path, "repeating field requires `itemFields`").with_field(name),
                );
                return None;
            };
            if let (Some(min), Some(max)) = (raw.min_items, raw.max_items)
                && min > max
            {
                self.violations.push(
                    Violation::new(
                        path,
                        format!("minItems ({min}) must not exceed maxItems ({max})"),
                    )
                    .with_field(name),
                );
                return None;
            }

            let before = self.violations.len();
            let mut item_fields = Vec::new();
            let mut item_names = BTreeSet::new();
            for (index, item) in raw_items.iter().enumerate() {
                let item_path = format!("{path}.itemFields[{index}]");
                let item_kind = item.kind.as_deref().map(str::trim).unwrap_or_default();
                if item_kind == CONTAINER_TYPE {
                    self.violations.push(
                        Violation::new(item_path, "item fields cannot be containers")
                            .with_field(name),
                    );
                    continue;
                }
                if item_kind.is_empty() {
                    self.violations.push(Violation::new(
                        item_path,
                        "element is missing a non-empty `type`",
                    ));
                    continue;
                }
                if let Some(field) = self.field(item, item_kind, &item_path) {
                    if field.depends_on.is_some() {
                        self.violations.push(
                            Violation::new(item_path, "item fields cannot declare `dependsOn`")
                                .with_field(&field.name),
                        );
                        continue;
                    }
                    if !item_names.insert(field.name.clone()) {
                        self.violations.push(
                            Violation::new(item_path, "item field name is declared more than once")
                                .with_field(&field.name),
                        );
                        continue;
                    }
                    item_fields.push(field);
                }
            }
            if self.violations.len() > before {
                return None;
            }

            return Some(FieldShape::Repeating(RepeatingShape {
                item_fields,
                min_items: raw.min_items,
                max_items: raw.max_items,
            }));
        }

        if raw.options.is_some() || raw.options_provider.is_some() || CHOICE_TYPES.contains(&kind) {
            if raw.options.is_none() && raw.options_provider.is_none() {
                self.violations.push(
                    Violation::new(
                        path,
                        "choice field requires `options` or an `optionsProvider`",
                    )
                    .with_field(name),
                );
                return None;
            }
            return Some(FieldShape::Choice(ChoiceShape {
                options: raw.options.clone().unwrap_or_default(),
                multiple: raw.multiple.unwrap_or(kind == "multiselect"),
                options_provider: raw.options_provider.clone(),
            }));
        }

        Some(FieldShape::Generic)
    }
}
