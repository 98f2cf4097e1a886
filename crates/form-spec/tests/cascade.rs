use serde_json::{Value, json};

use form_spec::{
    ElementTree, FormEngine, Reset, build_dependency_map, on_field_changed, reset_value,
};

fn location_form() -> Value {
    json!([
        {
            "type": "select",
            "name": "country",
            "options": [ { "value": "ua", "label": "Ukraine" }, { "value": "us", "label": "USA" } ]
        },
        { "type": "select", "name": "city", "dependsOn": "country", "optionsProvider": "cities" },
        { "type": "text", "name": "district", "dependsOn": "city" },
        { "type": "multiselect", "name": "languages", "dependsOn": "country", "options": [] },
        { "type": "checkbox", "name": "resident", "dependsOn": "country" },
        { "type": "text", "name": "note", "dependsOn": "country", "resetOnParentChange": false },
        { "type": "text", "name": "zip", "dependsOn": "city", "defaultValue": "00000" }
    ])
}

fn reset(field: &str, value: Value) -> Reset {
    Reset {
        field: field.into(),
        value,
    }
}

#[test]
fn dependency_map_keeps_declaration_order() {
    let tree = ElementTree::from_value(&location_form()).expect("valid");
    let map = build_dependency_map(&tree);
    let expected = vec!["city", "languages", "resident", "note"];
    assert_eq!(map["country"], expected);
    assert_eq!(map["city"], vec!["district", "zip"]);
    assert!(!map.contains_key("district"));
}

#[test]
fn changed_parent_resets_direct_dependents_with_structural_defaults() {
    let engine = FormEngine::from_value(&location_form()).expect("engine");
    let previous = json!({ "country": "ua", "city": "kyiv", "district": "podil" });
    let current = json!({ "country": "us", "city": "kyiv", "district": "podil" });

    let resets = engine.on_field_changed("country", &previous, &current);
    assert_eq!(
        resets,
        vec![
            reset("city", Value::Null),
            reset("languages", json!([])),
            reset("resident", json!(false)),
        ]
    );
}

#[test]
fn unchanged_parent_value_produces_no_resets() {
    let engine = FormEngine::from_value(&location_form()).expect("engine");
    let data = json!({ "country": "ua", "city": "kyiv" });
    let resets = engine.on_field_changed("country", &data, &data);
    assert!(resets.is_empty());
}

#[test]
fn chains_advance_one_level_per_call() {
    let engine = FormEngine::from_value(&location_form()).expect("engine");
    let previous = json!({ "country": "ua", "city": "kyiv", "district": "podil", "zip": "01001" });
    let current = json!({ "country": "us", "city": "kyiv", "district": "podil", "zip": "01001" });

    let first = engine.on_field_changed("country", &previous, &current);
    assert!(first.iter().all(|reset| reset.field != "district"));

    let after_first = engine.apply_resets(&current, &first);
    assert_eq!(after_first["city"], Value::Null);
    assert_eq!(current["city"], "kyiv", "input data is left untouched");

    let second = engine.on_field_changed("city", &current, &after_first);
    assert_eq!(
        second,
        vec![
            Reset { field: "district".into(), value: json!("") },
            Reset { field: "zip".into(), value: json!("00000") },
        ]
    );
}

#[test]
fn reset_value_prefers_declared_default() {
    let tree = ElementTree::from_value(&json!([
        { "type": "select", "name": "size", "options": [], "defaultValue": "m" },
        { "type": "select", "name": "none", "options": [], "defaultValue": null },
        { "type": "array", "name": "rows", "itemFields": [] },
        { "type": "rich-text", "name": "bio" }
    ]))
    .expect("valid");
    assert_eq!(reset_value(tree.field("size").expect("size")), json!("m"));
    assert_eq!(reset_value(tree.field("none").expect("none")), Value::Null);
    assert_eq!(reset_value(tree.field("rows").expect("rows")), json!([]));
    assert_eq!(reset_value(tree.field("bio").expect("bio")), json!(""));
}

#[test]
fn unknown_parent_name_yields_nothing() {
    let tree = ElementTree::from_value(&location_form()).expect("valid");
    let map = build_dependency_map(&tree);
    assert!(on_field_changed("district", &tree, &map).is_empty());
    assert!(on_field_changed("nope", &tree, &map).is_empty());
}
