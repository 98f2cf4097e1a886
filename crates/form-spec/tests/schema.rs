use serde_json::{Value, json};

use form_spec::schema::BaseType;
use form_spec::{ElementTree, Evaluator, FieldErrors, Validator, generate};

fn validator(config: Value) -> Validator {
    let tree = ElementTree::from_value(&config).expect("valid tree");
    generate(&tree, &Evaluator::default())
}

fn code(errors: &FieldErrors, path: &str) -> Option<String> {
    errors.get(path).map(|error| error.code.clone())
}

#[test]
fn text_constraints_compose() {
    let validator = validator(json!([{
        "type": "text",
        "name": "code",
        "validation": { "required": true, "minLength": 3, "maxLength": 10, "pattern": "^[A-Z]+$" }
    }]));

    let check = |value: &str| code(&validator.validate(&json!({ "code": value })), "code");
    assert_eq!(check("").as_deref(), Some("required"));
    assert_eq!(check("AB").as_deref(), Some("min_length"));
    assert_eq!(check("ABCDEFGHIJK").as_deref(), Some("max_length"));
    assert_eq!(check("abc").as_deref(), Some("pattern"));
    assert_eq!(check("ABC"), None);
    assert_eq!(
        code(&validator.validate(&json!({})), "code").as_deref(),
        Some("required")
    );
    assert_eq!(
        code(&validator.validate(&json!({ "code": 42 })), "code").as_deref(),
        Some("type_mismatch")
    );
}

#[test]
fn optional_empty_values_skip_constraints() {
    let validator = validator(json!([{
        "type": "text",
        "name": "nickname",
        "validation": { "minLength": 3, "pattern": "^[a-z]+$" }
    }]));
    assert!(validator.is_valid(&json!({ "nickname": "" })));
    assert!(validator.is_valid(&json!({})));
}

#[test]
fn default_messages_use_labels() {
    let validator = validator(json!([{
        "type": "text",
        "name": "code",
        "label": "Promo code",
        "validation": { "minLength": 3 }
    }]));
    let errors = validator.validate(&json!({ "code": "A" }));
    let expected = "Promo code must be at least 3 characters";
    assert_eq!(errors["code"].message, expected);
}

#[test]
fn cross_field_condition_reports_at_the_field_path() {
    let validator = validator(json!([
        { "type": "checkbox", "name": "hasPhone" },
        {
            "type": "tel",
            "name": "phone",
            "validation": {
                "message": "Enter 10 digits",
                "condition": {
                    "or": [
                        { "!": { "var": "hasPhone" } },
                        { "and": [
                            { "var": "hasPhone" },
                            { "regex_match": ["^[0-9]{10}$", { "var": "phone" }] }
                        ] }
                    ]
                }
            }
        }
    ]));

    let hidden = json!({ "hasPhone": false, "phone": "" });
    assert!(validator.is_valid(&hidden));
    let filled = json!({ "hasPhone": true, "phone": "1234567890" });
    assert!(validator.is_valid(&filled));

    let errors = validator.validate(&json!({ "hasPhone": true, "phone": "123" }));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["phone"].code, "condition");
    assert_eq!(errors["phone"].message, "Enter 10 digits");
}

#[test]
fn independent_conditions_each_report() {
    let validator = validator(json!([
        { "type": "number", "name": "min" },
        {
            "type": "number",
            "name": "max",
            "validation": { "condition": { ">=": [{ "var": "max" }, { "var": "min" }] } }
        },
        {
            "type": "text",
            "name": "confirm",
            "label": "Confirmation",
            "validation": { "condition": { "==": [{ "var": "confirm" }, "yes"] } }
        }
    ]));

    let errors = validator.validate(&json!({ "min": 5, "max": 1, "confirm": "no" }));
    assert_eq!(code(&errors, "max").as_deref(), Some("condition"));
    assert_eq!(errors["confirm"].message, "Confirmation is invalid");
}

#[test]
fn nested_names_mirror_the_data_shape() {
    let validator = validator(json!([
        { "type": "text", "name": "a.b.c", "validation": { "required": true } },
        { "type": "text", "name": "a.d" }
    ]));

    let root = validator.root();
    let a = root.object("a").expect("object schema for a");
    let b = a.object("b").expect("object schema for b");
    assert!(b.field("c").is_some());
    assert_eq!(a.keys().collect::<Vec<_>>(), vec!["b", "d"]);
    assert!(root.field("a.b.c").is_some());

    assert!(validator.is_valid(&json!({ "a": { "b": { "c": "x" } } })));
    let errors = validator.validate(&json!({ "a": { "b": {} } }));
    assert_eq!(code(&errors, "a.b.c").as_deref(), Some("required"));

    let errors = validator.validate(&json!({ "a": "flat" }));
    assert_eq!(code(&errors, "a").as_deref(), Some("type_mismatch"));
}

#[test]
fn choice_fields_check_required_and_membership() {
    let validator = validator(json!([
        {
            "type": "select",
            "name": "country",
            "options": [ { "value": "ua", "label": "Ukraine" } ],
            "validation": { "required": true }
        },
        {
            "type": "multiselect",
            "name": "tags",
            "options": [ { "value": "a" }, { "value": "b" } ],
            "validation": { "required": true }
        },
        { "type": "select", "name": "city", "optionsProvider": "cities" }
    ]));

    let errors = validator.validate(&json!({ "country": null, "tags": [] }));
    assert_eq!(code(&errors, "country").as_deref(), Some("required"));
    assert_eq!(code(&errors, "tags").as_deref(), Some("required"));

    let errors = validator.validate(&json!({
        "country": "pl",
        "tags": ["a", "z"],
        "city": "any"
    }));
    assert_eq!(code(&errors, "country").as_deref(), Some("invalid_option"));
    assert_eq!(code(&errors, "tags").as_deref(), Some("invalid_option"));
    assert_eq!(code(&errors, "city"), None);

    let data = json!({ "country": "ua", "tags": ["b"] });
    assert!(validator.is_valid(&data));
}

#[test]
fn required_boolean_must_be_true() {
    let validator = validator(json!([
        { "type": "checkbox", "name": "terms", "validation": { "required": true } }
    ]));
    assert_eq!(
        code(&validator.validate(&json!({ "terms": false })), "terms").as_deref(),
        Some("required")
    );
    assert!(validator.is_valid(&json!({ "terms": true })));
}

#[test]
fn repeating_fields_recurse_into_items() {
    let validator = validator(json!([{
        "type": "array",
        "name": "contacts",
        "minItems": 1,
        "maxItems": 2,
        "itemFields": [
            { "type": "text", "name": "label", "validation": { "required": true } },
            { "type": "tel", "name": "number", "validation": { "pattern": "^[0-9]+$" } },
            {
                "type": "text",
                "name": "ext",
                "validation": { "condition": { "!": { "var": "ext" } }, "message": "No extensions" }
            }
        ]
    }]));

    let root = validator.root();
    match &root.field("contacts").expect("contacts").base {
        BaseType::Repeating { item, .. } => assert!(item.field("number").is_some()),
        other => panic!("unexpected base {other:?}"),
    }

    let errors = validator.validate(&json!({ "contacts": [] }));
    assert_eq!(code(&errors, "contacts").as_deref(), Some("min_items"));

    let errors = validator.validate(&json!({ "contacts": [{}, {}, {}] }));
    assert_eq!(code(&errors, "contacts").as_deref(), Some("max_items"));

    let errors = validator.validate(&json!({
        "contacts": [
            { "label": "home", "number": "123" },
            { "label": "", "number": "12a", "ext": "7" }
        ]
    }));
    assert_eq!(code(&errors, "contacts"), None);
    assert_eq!(errors["contacts.1.label"].code, "required");
    assert_eq!(errors["contacts.1.number"].code, "pattern");
    assert_eq!(errors["contacts.1.ext"].message, "No extensions");
    assert!(!errors.contains_key("contacts.0.label"));

    let errors = validator.validate(&json!({ "contacts": ["oops"] }));
    assert_eq!(errors["contacts.0"].code, "type_mismatch");
}

#[test]
fn open_world_and_delegate_fields_accept_anything() {
    let validator = validator(json!([
        { "type": "rich-text", "name": "body" },
        { "type": "custom", "name": "map", "component": "MapPin" }
    ]));
    for value in [json!(null), json!("text"), json!(3), json!({ "ops": [] }), json!([1])] {
        let data = json!({ "body": value, "map": value });
        assert!(validator.is_valid(&data), "{value}");
    }
}

#[test]
fn invalid_pattern_degrades_to_no_constraint() {
    let validator = validator(json!([
        { "type": "text", "name": "code", "validation": { "pattern": "([A-Z" } }
    ]));
    let root = validator.root();
    assert!(root.field("code").expect("code").pattern.is_none());
    assert!(validator.is_valid(&json!({ "code": "anything" })));
}

#[test]
fn item_conditions_can_read_whole_form_values() {
    let validator = validator(json!([
        { "type": "checkbox", "name": "requireExt" },
        { "type": "text", "name": "ext" },
        {
            "type": "array",
            "name": "contacts",
            "itemFields": [{
                "type": "text",
                "name": "ext",
                "validation": {
                    "message": "Extension required",
                    "condition": { "or": [{ "!": { "var": "requireExt" } }, { "var": "ext" }] }
                }
            }]
        }
    ]));

    let errors = validator.validate(&json!({
        "requireExt": true,
        "ext": "outer",
        "contacts": [ { "ext": "" }, { "ext": "12" } ]
    }));
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert_eq!(errors["contacts.0.ext"].code, "condition");
    assert_eq!(errors["contacts.0.ext"].message, "Extension required");

    let data = json!({ "requireExt": false, "contacts": [ { "ext": "" } ] });
    assert!(validator.is_valid(&data));
}

#[test]
fn empty_static_options_accept_nothing() {
    let validator = validator(json!([
        { "type": "select", "name": "pick", "options": [] },
        { "type": "multiselect", "name": "many", "options": [] }
    ]));

    let errors = validator.validate(&json!({ "pick": "anything-at-all", "many": ["x"] }));
    assert_eq!(code(&errors, "pick").as_deref(), Some("invalid_option"));
    assert_eq!(code(&errors, "many").as_deref(), Some("invalid_option"));
    assert!(validator.is_valid(&json!({ "pick": null, "many": [] })));
}
