use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp|lt|gt|quot|#39|nbsp|#(\d+));").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Decode the entities the scraper leaves behind in page fragments.
///
/// One left-to-right pass: `&amp;lt;` becomes `&lt;`, never `<`. Numeric
/// references that don't name a valid scalar value are left as-is.
pub fn decode_entities(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    ENTITY_RE
        .replace_all(s, |caps: &Captures| -> Cow<'static, str> {
            match &caps[1] {
                "amp" => "&".into(),
                "lt" => "<".into(),
                "gt" => ">".into(),
                "quot" => "\"".into(),
                "#39" => "'".into(),
                "nbsp" => " ".into(),
                _ => caps
                    .get(2)
                    .and_then(|d| d.as_str().parse::<u32>().ok())
                    .and_then(char::from_u32)
                    .map(|c| Cow::Owned(c.to_string()))
                    .unwrap_or_else(|| Cow::Owned(caps[0].to_string())),
            }
        })
        .into_owned()
}

/// Decode entities, then collapse whitespace runs to one space and trim.
pub fn clean_text(s: &str) -> String {
    let decoded = decode_entities(s);
    WS_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Strip markup from an HTML fragment and return its readable text.
pub fn normalize_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let stripped = TAG_RE.replace_all(html, " ");
    clean_text(&stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_named_entities() {
        assert_eq!(
            decode_entities("Tom &amp; Jerry &lt;3 &quot;cheese&quot; &#39;n&#39; crackers&nbsp;!"),
            "Tom & Jerry <3 \"cheese\" 'n' crackers !"
        );
    }

    #[test]
    fn decodes_numeric_references() {
        assert_eq!(decode_entities("caf&#233; &#8364;5"), "café €5");
    }

    #[test]
    fn no_double_decoding() {
        assert_eq!(decode_entities("&amp;lt;b&amp;gt;"), "&lt;b&gt;");
        assert_eq!(decode_entities("&amp;#39;"), "&#39;");
    }

    #[test]
    fn unknown_entities_pass_through() {
        assert_eq!(decode_entities("&copy; &#xA9; &bogus;"), "&copy; &#xA9; &bogus;");
        assert_eq!(decode_entities("&#55296;"), "&#55296;");
    }

    #[test]
    fn empty_input() {
        assert_eq!(decode_entities(""), "");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn strips_tags_and_collapses() {
        let html = "<div>\n  <p>Send <b>Slack</b>&nbsp;messages</p>\n<p>on &lt;new&gt; rows</p></div>";
        assert_eq!(normalize_text(html), "Send Slack messages on <new> rows");
    }

    #[test]
    fn adjacent_tags_do_not_glue_words() {
        assert_eq!(normalize_text("<li>one</li><li>two</li>"), "one two");
    }

    proptest! {
        #[test]
        fn decode_is_idempotent_without_entities(s in "[^&]*") {
            let once = decode_entities(&s);
            prop_assert_eq!(decode_entities(&once), once);
        }

        #[test]
        fn tagless_text_is_collapsed_and_trimmed(s in "[a-z \t\n]{0,40}") {
            let expected = s.split_whitespace().collect::<Vec<_>>().join(" ");
            prop_assert_eq!(normalize_text(&s), expected);
        }
    }
}
