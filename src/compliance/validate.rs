use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static NODE_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(@n8n/|n8n-nodes-base\.)").unwrap());

/// Minimum shape of a workflow payload: `nodes` array, `connections` object,
/// a `meta.instanceId`, and at least one node that looks real.
///
/// One good node is enough; the rest may be partial.
pub fn is_valid_workflow(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    let Some(nodes) = obj.get("nodes").and_then(Value::as_array) else {
        return false;
    };
    if !obj.get("connections").is_some_and(Value::is_object) {
        return false;
    }
    nodes.iter().any(is_valid_node) && has_instance_id(obj.get("meta"))
}

pub fn is_valid_node(node: &Value) -> bool {
    let has_id = match node.get("id") {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    };
    let has_type = node
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| NODE_TYPE_RE.is_match(t));
    let has_parameters = node.get("parameters").is_some_and(Value::is_object);

    has_id && has_type && has_parameters && is_position(node.get("position"))
}

pub(crate) fn is_position(value: Option<&Value>) -> bool {
    matches!(value.and_then(Value::as_array), Some(xy) if xy.len() == 2 && xy.iter().all(Value::is_number))
}

fn has_instance_id(meta: Option<&Value>) -> bool {
    meta.and_then(|m| m.get("instanceId"))
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty())
}
