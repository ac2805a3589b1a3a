//! Model values and overlay merging

use crate::error::ServerConfigError;
use serde_json::{Map, Value, json};
use tracing::debug;

/// Builds the operator-owned part of a node configuration.
///
/// Seeds are passed as host names (normally the seed service name, which
/// resolves to the seed nodes), so the rendered file does not need to change
/// when seed pods come and go.
pub fn model_values(seeds: &[&str], cluster_name: &str, datacenter_name: &str) -> Value {
    json!({
        "cluster-info": {
            "name": cluster_name,
            "seeds": seeds.join(","),
        },
        "datacenter-info": {
            "name": datacenter_name,
        },
    })
}

/// Merges a user overlay into a model document.
///
/// Nested objects are merged key by key. Any other overlay value replaces
/// the model value at the same path.
pub fn merge(model: Value, overlay: &Value) -> Result<Value, ServerConfigError> {
    let Value::Object(mut model) = model else {
        return Err(ServerConfigError::InvalidDocument { which: "model", found: type_name(&model) });
    };
    let Value::Object(overlay) = overlay else {
        return Err(ServerConfigError::InvalidDocument {
            which: "overlay",
            found: type_name(overlay),
        });
    };
    merge_objects(&mut model, overlay);
    Ok(Value::Object(model))
}

fn merge_objects(target: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_objects(existing, nested)
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Renders the JSON string handed to the config-builder init container.
pub fn render(
    seeds: &[&str],
    cluster_name: &str,
    datacenter_name: &str,
    overlay: Option<&Value>,
) -> Result<String, ServerConfigError> {
    let model = model_values(seeds, cluster_name, datacenter_name);
    let merged = match overlay {
        Some(overlay) => merge(model, overlay)?,
        None => model,
    };
    debug!("Rendered node config for cluster {} datacenter {}", cluster_name, datacenter_name);
    Ok(serde_json::to_string(&merged)?)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
