use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// One record as it comes out of the scraping service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeInput {
    #[serde(default, deserialize_with = "string_or_number")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub status: String,
    #[serde(default)]
    pub workflow_details: Option<String>,
    #[serde(default)]
    pub workflow_description: Option<String>,
    #[serde(default)]
    pub workflow_demo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScrapeResultWire")]
pub struct ScrapeResult {
    pub url: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<WorkflowDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo: Option<Demo>,
    /// Set alongside `demo` so consumers need not sniff its shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_kind: Option<DemoKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_demo: Option<bool>,
}

// `demo` has to be read as a plain value first so `demo_kind` can pick the variant.
#[derive(Deserialize)]
struct ScrapeResultWire {
    url: String,
    status: String,
    #[serde(default)]
    details: Option<WorkflowDetails>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    demo: Option<Value>,
    #[serde(default)]
    demo_kind: Option<DemoKind>,
    #[serde(default)]
    has_demo: Option<bool>,
}

impl From<ScrapeResultWire> for ScrapeResult {
    fn from(wire: ScrapeResultWire) -> Self {
        let hint = wire.demo_kind;
        let demo = wire.demo.filter(|v| !v.is_null()).map(|v| {
            let kind = hint.unwrap_or_else(|| Demo::classify(&v));
            Demo::from_value(v, kind)
        });
        ScrapeResult {
            url: wire.url,
            status: wire.status,
            details: wire.details,
            description: wire.description,
            demo,
            demo_kind: wire.demo_kind,
            has_demo: wire.has_demo,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl Creator {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.verified.is_none()
    }
}

/// What the demo cascade found. Only `Workflow` carries workflow JSON; the
/// other two are terminal captures of the preview block.
///
/// Serialized untagged. Deserializing goes through [`Demo::classify`], and
/// any object that does not have exactly a capture's keys stays a `Workflow`,
/// so nothing is dropped on the way back in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Demo {
    Iframe {
        iframe_url: String,
    },
    RawCapture {
        raw_html: String,
        structure_match: bool,
        extracted_at: String,
    },
    Workflow(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoKind {
    Workflow,
    Iframe,
    RawCapture,
}

impl Demo {
    pub fn kind(&self) -> DemoKind {
        match self {
            Demo::Workflow(_) => DemoKind::Workflow,
            Demo::Iframe { .. } => DemoKind::Iframe,
            Demo::RawCapture { .. } => DemoKind::RawCapture,
        }
    }

    /// Recover the kind of an already-serialized demo value that arrived
    /// without a `demo_kind` next to it.
    pub fn classify(value: &Value) -> DemoKind {
        let has = |key: &str| value.get(key).is_some();
        if has("nodes") {
            DemoKind::Workflow
        } else if has("iframe_url") {
            DemoKind::Iframe
        } else if has("raw_html") && value.get("structure_match") == Some(&Value::Bool(true)) {
            DemoKind::RawCapture
        } else {
            DemoKind::Workflow
        }
    }

    /// Rebuild a demo of the given kind. Falls back to `Workflow` unless the
    /// value carries exactly the capture's fields with the right types.
    pub fn from_value(value: Value, kind: DemoKind) -> Demo {
        let Some(obj) = value.as_object() else {
            return Demo::Workflow(value);
        };
        let field = |key: &str| obj.get(key).and_then(Value::as_str);
        match kind {
            DemoKind::Iframe if obj.len() == 1 => {
                if let Some(url) = field("iframe_url") {
                    return Demo::Iframe {
                        iframe_url: url.to_string(),
                    };
                }
            }
            DemoKind::RawCapture if obj.len() == 3 => {
                let structure_match = obj.get("structure_match").and_then(Value::as_bool);
                if let (Some(raw), Some(m), Some(at)) =
                    (field("raw_html"), structure_match, field("extracted_at"))
                {
                    return Demo::RawCapture {
                        raw_html: raw.to_string(),
                        structure_match: m,
                        extracted_at: at.to_string(),
                    };
                }
            }
            _ => {}
        }
        Demo::Workflow(value)
    }

    pub fn as_workflow(&self) -> Option<&Value> {
        match self {
            Demo::Workflow(v) => Some(v),
            _ => None,
        }
    }
}

/// A workflow payload after compliance normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPayload {
    pub nodes: Vec<Node>,
    pub connections: Map<String, Value>,
    #[serde(rename = "pinData")]
    pub pin_data: Map<String, Value>,
    pub meta: Meta,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "instanceId")]
    pub instance_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: [Number; 2],
    pub parameters: Map<String, Value>,
    #[serde(rename = "typeVersion")]
    pub type_version: Number,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for Demo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let kind = Demo::classify(&value);
        Ok(Demo::from_value(value, kind))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
