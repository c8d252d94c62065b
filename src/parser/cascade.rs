//! Ordered strategies for digging a workflow out of the demo fragment.
//!
//! Strategies run most-specific first and the first hit wins. A strategy that
//! matches but fails to parse (or parses to something structurally invalid,
//! where it checks) just hands over to the next one.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::compliance::validate::is_valid_workflow;
use crate::ids::Clock;
use crate::model::Demo;
use crate::text::decode_entities;

const WORKFLOW_SCRIPT_SELECTOR: &str = r#"script#n8n-workflow-data[data-hypercontext="true"]"#;

static CONTAINER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?is)<div[^>]*class="[^"]*grid-container[^"]*"[^>]*>.*?"#,
        r#"<div[^>]*class="[^"]*template-column[^"]*"[^>]*>.*?"#,
        r#"<div[^>]*class="[^"]*workflow-preview[^"]*"[^>]*>(.*?)</div>"#,
    ))
    .unwrap()
});
static IFRAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<iframe[^>]*src="(https?://[^"]+)""#).unwrap());
static INLINE_NODES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\{"nodes"\s*:\s*\["#).unwrap());
static DEMO_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<n8n-demo[^>]*\sworkflow="([^"]*)""#).unwrap());
static DIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{\s*"nodes"\s*:\s*\[\s*\{\s*"parameters".*?"meta"\s*:\s*\{.*?\}\s*\}"#).unwrap()
});
static EMBEDDED_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""n8n_workflow_json"\s*:\s*""#).unwrap());
static DATA_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)data-workflow="([^"]*)""#).unwrap());
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>(.*?)</script>").unwrap());
static OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());
static LOOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?s)\{.*"nodes".*\}"#).unwrap());
static NODES_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""nodes"\s*:\s*\["#).unwrap());
static NODES_ARRAY_LAZY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"nodes"\s*:\s*\[.*?\]"#).unwrap());

pub struct Strategy {
    pub name: &'static str,
    run: fn(&str, &dyn Clock) -> Option<Demo>,
}

pub static STRATEGIES: [Strategy; 8] = [
    Strategy { name: "nested_container", run: nested_container },
    Strategy { name: "direct_pattern", run: direct_pattern },
    Strategy { name: "document_script", run: document_script },
    Strategy { name: "embedded_field", run: embedded_field },
    Strategy { name: "data_attribute", run: data_attribute },
    Strategy { name: "script_tag", run: script_tag },
    Strategy { name: "loose_nodes", run: loose_nodes },
    Strategy { name: "reconstructed_nodes", run: reconstructed_nodes },
];

#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub strategy: &'static str,
    pub demo: Demo,
}

/// Run the cascade and report which strategy produced the hit.
pub fn locate_demo(html: &str, clock: &dyn Clock) -> Option<Located> {
    if html.trim().is_empty() {
        return None;
    }
    STRATEGIES.iter().find_map(|s| {
        let demo = (s.run)(html, clock)?;
        debug!(strategy = s.name, kind = ?demo.kind(), "demo located");
        Some(Located { strategy: s.name, demo })
    })
}

pub fn extract_demo(html: &str, clock: &dyn Clock) -> Option<Demo> {
    locate_demo(html, clock).map(|l| l.demo)
}

/// grid-container > template-column > workflow-preview. Once the structure
/// matches this always returns something: the iframe, a workflow found in
/// the preview, or the preview markup itself.
fn nested_container(html: &str, clock: &dyn Clock) -> Option<Demo> {
    let preview = CONTAINER_RE
        .captures(html)?
        .get(1)
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())?;

    if let Some(caps) = IFRAME_RE.captures(preview) {
        return Some(Demo::Iframe {
            iframe_url: caps[1].to_string(),
        });
    }

    if let Some(workflow) = inline_nodes(preview).or_else(|| demo_element(preview)) {
        return Some(Demo::Workflow(workflow));
    }

    Some(Demo::RawCapture {
        raw_html: preview.to_string(),
        structure_match: true,
        extracted_at: clock.timestamp(),
    })
}

fn inline_nodes(preview: &str) -> Option<Value> {
    let decoded = decode_entities(preview);
    let start = INLINE_NODES_RE.find(&decoded)?.start();
    parse_leading(&decoded[start..], "nested_container").filter(has_nodes)
}

fn demo_element(preview: &str) -> Option<Value> {
    let caps = DEMO_ATTR_RE.captures(preview)?;
    let unescaped = percent_decode_str(&caps[1]).decode_utf8_lossy();
    parse_json(&decode_entities(&unescaped), "nested_container").filter(has_nodes)
}

fn direct_pattern(html: &str, _clock: &dyn Clock) -> Option<Demo> {
    let m = DIRECT_RE.find(html)?;
    let value = parse_leading(&html[m.start()..], "direct_pattern")
        .or_else(|| parse_json(m.as_str(), "direct_pattern"))?;
    validated(value, "direct_pattern").map(Demo::Workflow)
}

fn document_script(html: &str, _clock: &dyn Clock) -> Option<Demo> {
    let selector = Selector::parse(WORKFLOW_SCRIPT_SELECTOR).ok()?;
    let document = Html::parse_document(html);
    let body: String = document.select(&selector).next()?.text().collect();

    let decoded = decode_entities(&body);
    let object = strip_js_wrapper(&decoded)?;
    let value = parse_json(object, "document_script").or_else(|| {
        let unescaped = unescape_js(object);
        parse_json(strip_js_wrapper(&unescaped)?, "document_script")
    })?;
    validated(value, "document_script").map(Demo::Workflow)
}

/// `"n8n_workflow_json": "<escaped workflow>"` left behind by API responses.
fn embedded_field(html: &str, _clock: &dyn Clock) -> Option<Demo> {
    let m = EMBEDDED_FIELD_RE.find(html)?;
    let value = match parse_leading(&html[m.end() - 1..], "embedded_field")? {
        Value::String(inner) => parse_json(&inner, "embedded_field")?,
        other => other,
    };
    validated(value, "embedded_field").map(Demo::Workflow)
}

fn data_attribute(html: &str, _clock: &dyn Clock) -> Option<Demo> {
    let caps = DATA_ATTR_RE.captures(html)?;
    if caps[1].is_empty() {
        return None;
    }
    parse_json(&decode_entities(&caps[1]), "data_attribute").map(Demo::Workflow)
}

fn script_tag(html: &str, _clock: &dyn Clock) -> Option<Demo> {
    SCRIPT_RE.captures_iter(html).find_map(|caps| {
        let body = caps[1].trim();
        let object = OBJECT_RE.find(body)?;
        parse_json(object.as_str(), "script_tag").map(Demo::Workflow)
    })
}

fn loose_nodes(html: &str, _clock: &dyn Clock) -> Option<Demo> {
    let m = LOOSE_RE.find(html)?;
    if let Some(value) = parse_json(m.as_str(), "loose_nodes") {
        return Some(Demo::Workflow(value));
    }
    // The greedy span usually overshoots; retry from the brace nearest to "nodes".
    let span = m.as_str();
    let nodes_at = span.find(r#""nodes""#)?;
    let open = span[..nodes_at].rfind('{')?;
    parse_leading(&span[open..], "loose_nodes")
        .filter(Value::is_object)
        .map(Demo::Workflow)
}

fn reconstructed_nodes(html: &str, _clock: &dyn Clock) -> Option<Demo> {
    let m = NODES_ARRAY_RE.find(html)?;
    if let Some(nodes @ Value::Array(_)) = parse_leading(&html[m.end() - 1..], "reconstructed_nodes") {
        return Some(Demo::Workflow(serde_json::json!({ "nodes": nodes })));
    }
    let fragment = NODES_ARRAY_LAZY_RE.find(html)?;
    parse_json(&format!("{{{}}}", fragment.as_str()), "reconstructed_nodes").map(Demo::Workflow)
}

fn parse_json(src: &str, strategy: &'static str) -> Option<Value> {
    match serde_json::from_str(src) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(strategy, error = %e, "candidate is not valid JSON");
            None
        }
    }
}

/// Parse the first complete JSON value at the start of `src`, ignoring
/// whatever follows it.
fn parse_leading(src: &str, strategy: &'static str) -> Option<Value> {
    match serde_json::Deserializer::from_str(src).into_iter::<Value>().next()? {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(strategy, error = %e, "candidate is not valid JSON");
            None
        }
    }
}

fn validated(value: Value, strategy: &'static str) -> Option<Value> {
    if is_valid_workflow(&value) {
        Some(value)
    } else {
        debug!(strategy, "parsed candidate is not a structurally valid workflow");
        None
    }
}

fn has_nodes(value: &Value) -> bool {
    value.get("nodes").is_some_and(|n| !n.is_null())
}

/// Drop a leading `var x =` and trailing `;` around an object literal.
fn strip_js_wrapper(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

fn unescape_js(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\n", "").replace("\\t", "")
}
