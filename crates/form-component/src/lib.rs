use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use form_spec::{ConfigError, ElementNode, Field, FieldErrors, FormEngine, Reset};

const DEFAULT_FORM: &str = include_str!("../../form-spec/tests/fixtures/registration_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse form configuration: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to parse {0} json: {1}")]
    InputParse(&'static str, #[source] serde_json::Error),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

fn load_engine(config_json: &str) -> Result<FormEngine, ComponentError> {
    let source = if config_json.trim().is_empty() {
        DEFAULT_FORM
    } else {
        config_json
    };
    let config: Value = serde_json::from_str(source).map_err(ComponentError::ConfigParse)?;
    Ok(FormEngine::from_value(&config)?)
}

fn parse_input(label: &'static str, raw: &str) -> Result<Value, ComponentError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(raw).map_err(|err| ComponentError::InputParse(label, err))
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => {
            debug!(error = %err, "form component request failed");
            json!({ "error": err.to_string() }).to_string()
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

fn describe_field(field: &Field) -> Value {
    let mut map = Map::new();
    map.insert("name".into(), Value::String(field.name.clone()));
    map.insert("type".into(), Value::String(field.kind.clone()));
    map.insert("shape".into(), Value::String(field.shape_name().into()));
    map.insert("renderKey".into(), Value::String(field.render_key().into()));
    map.insert("label".into(), Value::String(field.display_label().into()));
    map.insert("required".into(), Value::Bool(field.is_required()));
    if let Some(parent) = &field.depends_on {
        map.insert("dependsOn".into(), Value::String(parent.clone()));
        map.insert(
            "resetOnParentChange".into(),
            Value::Bool(field.reset_on_parent_change),
        );
    }
    if let Some(meta) = &field.meta {
        map.insert("meta".into(), Value::Object(meta.clone()));
    }
    Value::Object(map)
}

/// Flat field listing plus the derived dependency map and policy.
pub fn describe(config_json: &str) -> String {
    respond(load_engine(config_json).and_then(|engine| {
        let fields = engine
            .tree()
            .fields()
            .into_iter()
            .map(describe_field)
            .collect::<Vec<_>>();
        Ok(json!({
            "fields": fields,
            "dependencies": encode(engine.dependencies())?,
            "invisibleFieldValidation": encode(&engine.policy())?,
        }))
    }))
}

fn render_target(node: &ElementNode) -> Value {
    match node {
        ElementNode::Field(field) => json!({
            "element": "field",
            "name": field.name,
            "renderKey": field.render_key(),
        }),
        ElementNode::Container(container) => json!({
            "element": "container",
            "renderKey": container.render_key(),
            "children": container.children.iter().map(render_target).collect::<Vec<_>>(),
        }),
    }
}

/// Element tree reduced to what an external renderer registry dispatches on.
pub fn render_targets(config_json: &str) -> String {
    respond(load_engine(config_json).map(|engine| {
        Value::Array(engine.tree().roots().iter().map(render_target).collect())
    }))
}

pub fn visibility(config_json: &str, data_json: &str) -> String {
    respond(load_engine(config_json).and_then(|engine| {
        let data = parse_input("data", data_json)?;
        encode(&engine.visibility(&data))
    }))
}

fn validation_payload(errors: &FieldErrors) -> Result<Value, ComponentError> {
    Ok(json!({
        "valid": errors.values().all(|error| !error.is_blocking()),
        "errors": encode(errors)?,
    }))
}

pub fn validate(config_json: &str, data_json: &str) -> String {
    respond(load_engine(config_json).and_then(|engine| {
        let data = parse_input("data", data_json)?;
        validation_payload(&engine.resolve(&data))
    }))
}

/// Resets owed after `field` changed from `previous_json` to `data_json`,
/// together with the data once those resets are applied.
pub fn cascade(config_json: &str, field: &str, previous_json: &str, data_json: &str) -> String {
    respond(load_engine(config_json).and_then(|engine| {
        let previous = parse_input("previous", previous_json)?;
        let data = parse_input("data", data_json)?;
        let resets: Vec<Reset> = engine.on_field_changed(field, &previous, &data);
        let next = engine.apply_resets(&data, &resets);
        Ok(json!({
            "resets": encode(&resets)?,
            "data": next,
        }))
    }))
}

pub fn initial_data(config_json: &str, overrides_json: &str) -> String {
    respond(load_engine(config_json).and_then(|engine| {
        let overrides = parse_input("overrides", overrides_json)?;
        Ok(engine.initial_data(&overrides))
    }))
}

/// Visibility for `data_json`, plus resolved errors when `validate` is set.
pub fn on_change(config_json: &str, data_json: &str, validate: bool) -> String {
    respond(load_engine(config_json).and_then(|engine| {
        let data = parse_input("data", data_json)?;
        encode(&engine.on_data_changed(&data, validate))
    }))
}
