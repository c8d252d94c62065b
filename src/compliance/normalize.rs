use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::ids::IdSource;
use crate::model::{Meta, Node, WorkflowPayload};

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub node_name_placeholder: String,
    pub node_type_placeholder: String,
    /// Also add the workflow-level keys the editor expects on import.
    pub fill_recommended: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            node_name_placeholder: "Unnamed Node".to_string(),
            node_type_placeholder: "unknown".to_string(),
            fill_recommended: false,
        }
    }
}

/// Fill every gap in a candidate workflow so it has the full required shape.
///
/// Only missing (or unusable) required fields are replaced; anything else on
/// the workflow, its meta or its nodes is carried over untouched.
pub fn normalize(workflow: Value, ids: &dyn IdSource, opts: &NormalizeOptions) -> WorkflowPayload {
    normalize_titled(workflow, None, ids, opts)
}

/// [`normalize`], with the template title used as the workflow `name` when
/// recommended keys are filled.
pub fn normalize_titled(
    workflow: Value,
    title: Option<&str>,
    ids: &dyn IdSource,
    opts: &NormalizeOptions,
) -> WorkflowPayload {
    let mut obj = match workflow {
        Value::Object(m) => m,
        _ => Map::new(),
    };

    let nodes = match obj.shift_remove("nodes") {
        Some(Value::Array(nodes)) => nodes,
        _ => Vec::new(),
    };
    let nodes = nodes
        .into_iter()
        .map(|n| normalize_node(n, ids, opts))
        .collect();

    let connections = take_object(&mut obj, "connections");
    let pin_data = take_object(&mut obj, "pinData");
    let meta = normalize_meta(obj.shift_remove("meta"), ids);

    if opts.fill_recommended {
        fill_recommended(&mut obj, title, ids);
    }

    WorkflowPayload {
        nodes,
        connections,
        pin_data,
        meta,
        extra: obj,
    }
}

pub fn normalize_node(node: Value, ids: &dyn IdSource, opts: &NormalizeOptions) -> Node {
    let mut fields = match node {
        Value::Object(m) => m,
        _ => Map::new(),
    };

    let id = match fields.shift_remove("id") {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => filled("id", ids.node_id()),
    };
    let name = take_string(&mut fields, "name")
        .unwrap_or_else(|| filled("name", opts.node_name_placeholder.clone()));
    let node_type = take_string(&mut fields, "type")
        .unwrap_or_else(|| filled("type", opts.node_type_placeholder.clone()));

    let position = match fields.shift_remove("position") {
        Some(Value::Array(xy)) => match xy.as_slice() {
            [Value::Number(x), Value::Number(y)] => [x.clone(), y.clone()],
            _ => filled("position", origin()),
        },
        _ => filled("position", origin()),
    };

    let parameters_given = fields.get("parameters").is_some_and(Value::is_object);
    let mut parameters = take_object(&mut fields, "parameters");
    if !parameters_given {
        debug!(node = %id, field = "parameters", "filled default");
    }
    let type_version = match fields.shift_remove("typeVersion") {
        Some(Value::Number(n)) => n,
        _ => match hoist_type_version(&mut parameters) {
            Some(n) => {
                debug!(node = %id, "typeVersion hoisted out of parameters");
                n
            }
            None => filled("typeVersion", Number::from(1)),
        },
    };

    Node {
        id,
        name,
        node_type,
        position,
        parameters,
        type_version,
        extra: fields,
    }
}

fn normalize_meta(meta: Option<Value>, ids: &dyn IdSource) -> Meta {
    let mut extra = match meta {
        Some(Value::Object(m)) => m,
        _ => Map::new(),
    };
    let instance_id = take_string(&mut extra, "instanceId")
        .unwrap_or_else(|| filled("meta.instanceId", ids.instance_id()));
    Meta { instance_id, extra }
}

fn fill_recommended(obj: &mut Map<String, Value>, title: Option<&str>, ids: &dyn IdSource) {
    obj.entry("id")
        .or_insert_with(|| Value::String(ids.node_id()));
    let name = title.filter(|t| !t.is_empty()).unwrap_or("Unnamed Workflow");
    obj.entry("name")
        .or_insert_with(|| Value::String(name.to_string()));
    obj.entry("settings")
        .or_insert_with(|| serde_json::json!({ "executionOrder": "v1" }));
    obj.entry("active").or_insert(Value::Bool(false));
}

fn filled<T>(field: &'static str, value: T) -> T {
    debug!(field, "filled default");
    value
}

// Some exports put typeVersion inside parameters.
fn hoist_type_version(parameters: &mut Map<String, Value>) -> Option<Number> {
    if !parameters.get("typeVersion").is_some_and(Value::is_number) {
        return None;
    }
    match parameters.shift_remove("typeVersion") {
        Some(Value::Number(n)) => Some(n),
        _ => None,
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.shift_remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match map.shift_remove(key) {
        Some(Value::Object(m)) => m,
        _ => Map::new(),
    }
}

fn origin() -> [Number; 2] {
    [Number::from(0), Number::from(0)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::validate::is_valid_workflow;
    use crate::ids::SequentialIds;
    use serde_json::json;

    fn run(input: Value) -> Value {
        let ids = SequentialIds::new();
        serde_json::to_value(normalize(input, &ids, &NormalizeOptions::default())).unwrap()
    }

    #[test]
    fn fills_every_default() {
        let out = run(json!({"nodes": [{"type": "noOp"}]}));
        assert_eq!(
            out,
            json!({
                "nodes": [{
                    "id": "node-1",
                    "name": "Unnamed Node",
                    "type": "noOp",
                    "position": [0, 0],
                    "parameters": {},
                    "typeVersion": 1
                }],
                "connections": {},
                "pinData": {},
                "meta": {"instanceId": "instance-2"}
            })
        );
    }

    #[test]
    fn random_ids_are_non_empty() {
        let payload = normalize(
            json!({"nodes": [{"type": "noOp"}]}),
            &crate::ids::RandomIds,
            &NormalizeOptions::default(),
        );
        assert!(!payload.nodes[0].id.is_empty());
        assert!(!payload.meta.instance_id.is_empty());
    }

    #[test]
    fn non_object_input_becomes_empty_workflow() {
        let out = run(json!("not a workflow"));
        assert_eq!(out["nodes"], json!([]));
        assert_eq!(out["connections"], json!({}));
        assert_eq!(out["meta"]["instanceId"], json!("instance-1"));
    }

    #[test]
    fn preserves_existing_and_unknown_fields() {
        let input = json!({
            "name": "My flow",
            "nodes": [{
                "parameters": {"url": "https://api.example.com"},
                "id": "abc",
                "name": "HTTP Request",
                "type": "n8n-nodes-base.httpRequest",
                "typeVersion": 4.2,
                "position": [250, -40],
                "credentials": {"httpBasicAuth": {"id": "7"}},
                "webhookId": "w-1"
            }],
            "connections": {"HTTP Request": {"main": [[]]}},
            "pinData": {"HTTP Request": [{"json": {}}]},
            "meta": {"instanceId": "keep-me", "templateCredsSetupCompleted": true}
        });
        let out = run(input);
        let node = &out["nodes"][0];
        assert_eq!(node["id"], "abc");
        assert_eq!(node["name"], "HTTP Request");
        assert_eq!(node["typeVersion"], json!(4.2));
        assert_eq!(node["position"], json!([250, -40]));
        assert_eq!(node["credentials"], json!({"httpBasicAuth": {"id": "7"}}));
        assert_eq!(node["webhookId"], "w-1");
        assert_eq!(out["connections"], json!({"HTTP Request": {"main": [[]]}}));
        assert_eq!(out["pinData"], json!({"HTTP Request": [{"json": {}}]}));
        assert_eq!(out["meta"], json!({"instanceId": "keep-me", "templateCredsSetupCompleted": true}));
        assert_eq!(out["name"], "My flow");
    }

    #[test]
    fn existing_meta_without_instance_id_is_completed() {
        let out = run(json!({"meta": {"templateId": "42"}}));
        assert_eq!(out["meta"], json!({"instanceId": "instance-1", "templateId": "42"}));
    }

    #[test]
    fn unusable_fields_are_replaced() {
        let out = run(json!({"nodes": [{
            "id": "",
            "name": null,
            "type": 3,
            "position": [1, "2"],
            "parameters": "none",
            "typeVersion": "2"
        }]}));
        let node = &out["nodes"][0];
        assert_eq!(node["id"], "node-1");
        assert_eq!(node["name"], "Unnamed Node");
        assert_eq!(node["type"], "unknown");
        assert_eq!(node["position"], json!([0, 0]));
        assert_eq!(node["parameters"], json!({}));
        assert_eq!(node["typeVersion"], json!(1));
    }

    #[test]
    fn numeric_id_is_kept_as_string() {
        let out = run(json!({"nodes": [{"id": 12}]}));
        assert_eq!(out["nodes"][0]["id"], "12");
    }

    #[test]
    fn misplaced_type_version_is_hoisted() {
        let out = run(json!({"nodes": [{"parameters": {"typeVersion": 3, "mode": "raw"}}]}));
        let node = &out["nodes"][0];
        assert_eq!(node["typeVersion"], json!(3));
        assert_eq!(node["parameters"], json!({"mode": "raw"}));

        let out = run(json!({"nodes": [{"typeVersion": 2, "parameters": {"typeVersion": 3}}]}));
        assert_eq!(out["nodes"][0]["typeVersion"], json!(2));
        assert_eq!(out["nodes"][0]["parameters"], json!({"typeVersion": 3}));
    }

    #[test]
    fn recommended_keys_only_on_request() {
        let ids = SequentialIds::new();
        let opts = NormalizeOptions {
            fill_recommended: true,
            ..NormalizeOptions::default()
        };
        let out = serde_json::to_value(normalize(json!({"name": "Kept"}), &ids, &opts)).unwrap();
        assert_eq!(out["name"], "Kept");
        assert_eq!(out["settings"], json!({"executionOrder": "v1"}));
        assert_eq!(out["active"], json!(false));
        assert!(out["id"].as_str().is_some_and(|id| !id.is_empty()));

        assert!(run(json!({})).get("settings").is_none());
    }

    #[test]
    fn recommended_name_prefers_template_title() {
        let opts = NormalizeOptions {
            fill_recommended: true,
            ..NormalizeOptions::default()
        };
        let titled = normalize_titled(json!({}), Some("Daily digest"), &SequentialIds::new(), &opts);
        assert_eq!(titled.extra["name"], "Daily digest");

        let blank = normalize_titled(json!({}), Some(""), &SequentialIds::new(), &opts);
        assert_eq!(blank.extra["name"], "Unnamed Workflow");

        let named = normalize_titled(json!({"name": "Mine"}), Some("Daily digest"), &SequentialIds::new(), &opts);
        assert_eq!(named.extra["name"], "Mine");

        let off = normalize_titled(json!({}), Some("Daily digest"), &SequentialIds::new(), &NormalizeOptions::default());
        assert!(off.extra.get("name").is_none());
    }

    #[test]
    fn normalized_real_node_validates() {
        let out = run(json!({"nodes": [{"type": "n8n-nodes-base.set"}]}));
        assert!(is_valid_workflow(&out));
    }
}
