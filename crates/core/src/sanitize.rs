//! Markup/script stripping for untrusted input.
//!
//! Every string reaching a pipeline is cleaned of `<script>` blocks, HTML tags,
//! `javascript:`/`vbscript:` URLs and inline event-handler assignments
//! (`onclick=`). Arrays and objects are walked recursively; numbers, booleans
//! and nulls pass through unchanged.
//!
//! Script blocks go in one regex pass. Everything else is removed by a single
//! left-to-right scan over an output buffer: a removal only ever truncates the
//! buffer, and the decision for each character depends only on what is already
//! in the buffer. Fragments that re-form a pattern once their middle is gone
//! (`javajavascript:script:`) are therefore removed in the same pass, the cost
//! stays linear, and `sanitize(sanitize(x)) == sanitize(x)`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("invalid script pattern")
});

/// Sanitize a single string.
pub fn sanitize_str(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    let mut scanner = Scanner::with_capacity(without_scripts.len());
    for c in without_scripts.chars() {
        scanner.push(c);
    }
    scanner.finish()
}

/// Sanitize arbitrary JSON input recursively.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

struct Scanner {
    out: String,
    /// Offset of the first unclosed `<` in `out`.
    open_tag: Option<usize>,
}

impl Scanner {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            open_tag: None,
        }
    }

    fn push(&mut self, c: char) {
        let cut = match c {
            '>' => self.open_tag,
            ':' => script_url_start(&self.out),
            '=' => event_handler_start(&self.out),
            _ => None,
        };
        match cut {
            Some(at) => self.truncate(at),
            None => {
                if c == '<' && self.open_tag.is_none() {
                    self.open_tag = Some(self.out.len());
                }
                self.out.push(c);
            }
        }
    }

    fn truncate(&mut self, at: usize) {
        self.out.truncate(at);
        if self.open_tag.is_some_and(|open| open >= at) {
            self.open_tag = None;
        }
    }

    fn finish(self) -> String {
        let trimmed = self.out.trim();
        if trimmed.len() == self.out.len() {
            self.out
        } else {
            trimmed.to_string()
        }
    }
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.as_bytes()[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

/// Start of a `javascript`/`vbscript` scheme ending `out`, ignoring trailing
/// whitespace.
fn script_url_start(out: &str) -> Option<usize> {
    let head = out.trim_end();
    if !ends_with_ignore_case(head, "script") {
        return None;
    }
    let head = &head[..head.len() - "script".len()];
    ["java", "vb"]
        .into_iter()
        .find(|prefix| ends_with_ignore_case(head, prefix))
        .map(|prefix| head.len() - prefix.len())
}

/// Start of an `on<name>` attribute name ending `out`, ignoring trailing
/// whitespace. The name must begin at a word boundary.
fn event_handler_start(out: &str) -> Option<usize> {
    let head = out.trim_end();
    let start = head
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .len();
    let name = &head[start..];
    let inside_word = head[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');
    (name.len() > 2 && name[..2].eq_ignore_ascii_case("on") && !inside_word).then_some(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

    static SCRIPT_URL: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)(?:java|vb)script\s*:").unwrap());

    static EVENT_HANDLER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\bon[a-z]+\s*=").unwrap());

    #[test]
    fn strips_script_blocks_with_content() {
        assert_eq!(
            sanitize_str("hello <script type=\"text/javascript\">alert('x')</script> world"),
            "hello  world"
        );
    }

    #[test]
    fn strips_tags_but_keeps_text() {
        assert_eq!(sanitize_str("<b>bold</b> and <i>italic</i>"), "bold and italic");
    }

    #[test]
    fn strips_script_urls_and_handlers() {
        assert_eq!(sanitize_str("JavaScript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_str("x onmouseover = steal()"), "x  steal()");
    }

    #[test]
    fn leaves_plain_text_alone() {
        let text = "Organic cotton t-shirt, size M (50% off) — only 3 left!";
        assert_eq!(sanitize_str(text), text);
        // "on" inside a word is not an event handler.
        assert_eq!(sanitize_str("Donation = 5"), "Donation = 5");
    }

    #[test]
    fn removes_patterns_reassembled_by_a_removal() {
        assert_eq!(sanitize_str("javajavascript:script:void(0)"), "void(0)");
        assert_eq!(sanitize_str("vbvbscript:script:run"), "run");
        assert_eq!(sanitize_str("java<b>script:alert(1)"), "alert(1)");
        assert_eq!(sanitize_str("on<i></i>click=go()"), "go()");
    }

    #[test]
    fn unclosed_angle_brackets_are_text() {
        assert_eq!(sanitize_str("3 < 5"), "3 < 5");
        assert_eq!(sanitize_str("a<b<c>d"), "ad");
        assert_eq!(sanitize_str("5 > 3"), "5 > 3");
    }

    #[test]
    fn deeply_nested_schemes_sanitize_in_linear_time() {
        let depth = 40_000;
        let input = format!(
            "{}javascript:{}void(0)",
            "java".repeat(depth),
            "script:".repeat(depth)
        );
        let started = std::time::Instant::now();
        let out = sanitize_str(&input);
        assert_eq!(out, "void(0)");
        assert!(
            started.elapsed() < std::time::Duration::from_secs(2),
            "took {:?}",
            started.elapsed()
        );

        let tags = format!("{}x{}", "<".repeat(depth), ">".repeat(depth));
        assert_eq!(sanitize_str(&tags), ">".repeat(depth - 1));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(sanitize_str("   padded   "), "padded");
    }

    #[test]
    fn walks_nested_values_and_keeps_scalars() {
        let input = json!({
            "name": "<img src=x onerror=alert(1)>Mug",
            "price": 12.5,
            "active": true,
            "tags": ["<b>new</b>", null, 3],
            "meta": { "note": "javascript:void(0)" }
        });

        let out = sanitize_value(input);
        assert_eq!(
            out,
            json!({
                "name": "Mug",
                "price": 12.5,
                "active": true,
                "tags": ["new", null, 3],
                "meta": { "note": "void(0)" }
            })
        );
    }

    fn fragment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("<script>".to_string()),
            Just("</script>".to_string()),
            Just("<scr".to_string()),
            Just("ipt>".to_string()),
            Just("<b>".to_string()),
            Just("java".to_string()),
            Just("javascript:".to_string()),
            Just("onclick=".to_string()),
            Just(" on".to_string()),
            Just(" ".to_string()),
            "[a-zA-Z0-9<>:=/ ]{0,6}",
        ]
    }

    fn dirty_string() -> impl Strategy<Value = String> {
        prop::collection::vec(fragment(), 0..12).prop_map(|parts| parts.concat())
    }

    fn dirty_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            dirty_string().prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: sanitizing twice is the same as sanitizing once.
        #[test]
        fn sanitize_str_is_idempotent(s in dirty_string()) {
            let once = sanitize_str(&s);
            prop_assert_eq!(sanitize_str(&once), once);
        }

        #[test]
        fn sanitize_value_is_idempotent(v in dirty_value()) {
            let once = sanitize_value(v);
            prop_assert_eq!(sanitize_value(once.clone()), once);
        }

        /// Property: no tag, script URL or handler survives sanitization.
        #[test]
        fn output_contains_no_markup(s in dirty_string()) {
            let out = sanitize_str(&s);
            prop_assert!(!TAG.is_match(&out));
            prop_assert!(!SCRIPT_URL.is_match(&out));
            prop_assert!(!EVENT_HANDLER.is_match(&out));
        }
    }
}
