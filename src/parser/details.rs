use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Creator, WorkflowDetails};
use crate::text::{clean_text, normalize_text};

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static PUBLISHED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<p>([^<]*)</p>").unwrap());
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)class="username_[^"]*"[^>]*>\s*([^<]*)\s*<"#).unwrap());
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="category-badge_[^"]*"[^>]*>\s*([^<]*)\s*<"#).unwrap());
static INTEGRATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="/integrations/([^/"]*)/""#).unwrap());

const VERIFIED_MARKERS: &[&str] = &["verified-icon", "verified v-popper"];

/// Pull the template header fields out of the details fragment. Every field
/// is independent; a miss just leaves it `None`.
pub fn extract(html: &str) -> WorkflowDetails {
    WorkflowDetails {
        title: title(html),
        published: published(html),
        creator: creator(html),
        categories: non_empty(categories(html)),
        integrations: non_empty(integrations(html)),
    }
}

/// Readable text of the description fragment.
pub fn description(html: &str) -> String {
    normalize_text(html)
}

pub fn title(html: &str) -> Option<String> {
    let caps = TITLE_RE.captures(html)?;
    Some(normalize_text(&caps[1])).filter(|t| !t.is_empty())
}

/// First bare `<p>` only; the details header puts the publish date there.
pub fn published(html: &str) -> Option<String> {
    let caps = PUBLISHED_RE.captures(html)?;
    Some(clean_text(&caps[1])).filter(|t| !t.is_empty())
}

pub fn creator(html: &str) -> Option<Creator> {
    let creator = Creator {
        username: USERNAME_RE
            .captures(html)
            .map(|c| clean_text(&c[1]))
            .filter(|u| !u.is_empty()),
        verified: VERIFIED_MARKERS
            .iter()
            .any(|m| html.contains(m))
            .then_some(true),
    };
    (!creator.is_empty()).then_some(creator)
}

pub fn categories(html: &str) -> Vec<String> {
    CATEGORY_RE
        .captures_iter(html)
        .map(|c| normalize_text(&c[1]))
        .filter(|c| !c.is_empty())
        .collect()
}

/// Integration slugs in document order. Repeats are kept.
pub fn integrations(html: &str) -> Vec<String> {
    INTEGRATION_RE
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(v: Vec<String>) -> Option<Vec<String>> {
    (!v.is_empty()).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/details.html").unwrap()
    }

    #[test]
    fn details_fixture() {
        let d = extract(&fixture());
        assert_eq!(d.title.as_deref(), Some("Send a Slack message when a Google Sheet row & tag change"));
        assert_eq!(d.published.as_deref(), Some("Published 3 months ago"));
        let creator = d.creator.unwrap();
        assert_eq!(creator.username.as_deref(), Some("jane_doe"));
        assert_eq!(creator.verified, Some(true));
        assert_eq!(d.categories.unwrap(), vec!["Marketing", "Sales & CRM"]);
        assert_eq!(
            d.integrations.unwrap(),
            vec!["google-sheets", "slack", "slack"]
        );
    }

    #[test]
    fn title_strips_inner_markup() {
        assert_eq!(
            title("<h1 class=\"t\">Hello <span>&amp; welcome</span></h1>").as_deref(),
            Some("Hello & welcome")
        );
    }

    #[test]
    fn only_first_paragraph_is_considered() {
        assert_eq!(published("<p>Jan 1</p><p>Jan 2</p>").as_deref(), Some("Jan 1"));
        assert_eq!(published("<p class=\"x\">Jan 1</p>"), None);
    }

    #[test]
    fn creator_needs_at_least_one_field() {
        assert_eq!(creator("<div>nobody</div>"), None);

        let badge_only = creator("<span class=\"verified v-popper--has-tooltip\"></span>").unwrap();
        assert_eq!(badge_only.username, None);
        assert_eq!(badge_only.verified, Some(true));

        let name_only = creator("<a class=\"username_x1\"> bob </a>").unwrap();
        assert_eq!(name_only.username.as_deref(), Some("bob"));
        assert_eq!(name_only.verified, None);
    }

    #[test]
    fn duplicate_integrations_are_preserved() {
        let html = r#"<a href="/integrations/slack/">Slack</a><a href="/integrations/slack/">Slack</a>"#;
        assert_eq!(integrations(html), vec!["slack", "slack"]);
    }

    #[test]
    fn categories_keep_document_order() {
        let html = r#"<span class="category-badge_b">Zeta</span><span class="category-badge_a">Alpha</span>"#;
        assert_eq!(categories(html), vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn missing_fields_are_omitted() {
        let d = extract("<div>nothing here</div>");
        assert_eq!(d, WorkflowDetails::default());
    }

    #[test]
    fn description_text() {
        assert_eq!(
            description("<div><h2>How it works</h2>\n<ul><li>Reads rows</li><li>Posts &quot;hi&quot;</li></ul></div>"),
            "How it works Reads rows Posts \"hi\""
        );
    }
}
