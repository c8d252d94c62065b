pub mod normalize;
pub mod validate;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::ids::IdSource;
use crate::model::{Demo, DemoKind};

pub use normalize::{normalize, normalize_titled, NormalizeOptions};
pub use validate::is_valid_workflow;

/// Second pass over a cleaned record: a record with a `demo` is replaced by
/// the compliant workflow built from it; anything else is returned as-is.
pub fn normalize_record(mut record: Value, ids: &dyn IdSource, opts: &NormalizeOptions) -> Value {
    let demo = match record.get_mut("demo").map(Value::take) {
        Some(demo) if !demo.is_null() => demo,
        _ => return record,
    };

    let kind = recorded_kind(&record).unwrap_or_else(|| Demo::classify(&demo));
    if kind != DemoKind::Workflow {
        debug!(?kind, url = ?record.get("url"), "normalizing a non-workflow capture");
    }

    let title = record.pointer("/details/title").and_then(Value::as_str);
    let payload = normalize_titled(demo, title, ids, opts);
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Check {
    pub url: Option<String>,
    pub valid: bool,
    pub kind: Option<DemoKind>,
}

/// Structural report for a record, or for a bare workflow when there is no
/// `demo` wrapper around it.
pub fn check_record(record: &Value) -> Check {
    let url = record.get("url").and_then(Value::as_str).map(str::to_string);
    let subject = match record.get("demo") {
        Some(Value::Null) | None if record.get("nodes").is_some() => Some(record),
        Some(Value::Null) | None => None,
        Some(demo) => Some(demo),
    };
    Check {
        url,
        valid: subject.is_some_and(is_valid_workflow),
        kind: subject.map(|s| recorded_kind(record).unwrap_or_else(|| Demo::classify(s))),
    }
}

fn recorded_kind(record: &Value) -> Option<DemoKind> {
    record
        .get("demo_kind")
        .and_then(|k| serde_json::from_value(k.clone()).ok())
}
