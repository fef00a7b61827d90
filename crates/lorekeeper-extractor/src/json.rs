//! Recover structured data from model output
//!
//! Models wrap JSON in markdown fences, surround it with prose, leave
//! trailing commas and return arrays where objects were asked for. This
//! module turns such text into records in four steps:
//!
//! 1. [`extract_json`] finds the outermost bracketed span
//! 2. [`repair_json`] fixes trailing commas and empty values
//! 3. [`Decoded::parse`] classifies the result as object, array or unparseable
//! 4. [`decode_one`] / [`decode_many`] / [`decode_strings`] map it onto records,
//!    falling back to [`coerce`] on individual fields when typed decoding fails
//!
//! The bracket scan is not a balanced parser. Brackets inside string
//! literals are not special-cased, and repair is textual, so both can touch
//! string contents.

use crate::error::ExtractorError;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Locate the best-effort JSON substring in a model response
///
/// Returns an empty string when no plausible span exists.
///
/// # Examples
///
/// ```
/// use lorekeeper_extractor::json::extract_json;
///
/// let raw = "Sure! Here you go:\n```json\n[{\"name\": \"Aria\"}]\n```\nAnything else?";
/// assert_eq!(extract_json(raw, true), "[{\"name\": \"Aria\"}]");
/// assert_eq!(extract_json("no data here", true), "");
/// ```
pub fn extract_json(raw: &str, expect_array: bool) -> String {
    let text = fenced_interior(raw.trim());

    let (open, close) = if expect_array { ('[', ']') } else { ('{', '}') };
    let start = match text.find(open) {
        Some(i) => i,
        None => return String::new(),
    };
    let end = match text.rfind(close) {
        Some(i) if i > start => i,
        _ => return String::new(),
    };

    text[start..=end].to_string()
}

/// Narrow to the interior of a fenced block, preferring one tagged `json`
///
/// A fence with no line break after it is left in place.
fn fenced_interior(text: &str) -> &str {
    let fence = match text.find("```json").or_else(|| text.find("```")) {
        Some(i) => i,
        None => return text,
    };

    let after_marker = &text[fence + 3..];
    let body = match after_marker.find('\n') {
        Some(newline) => &after_marker[newline + 1..],
        None => return text,
    };

    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

fn trailing_comma() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r",\s*([\]}])").expect("static pattern"))
}

fn empty_value() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r":\s*,").expect("static pattern"))
}

/// Fix the JSON mistakes models make most often
///
/// Removes commas directly before `]` or `}` and turns empty values
/// (`"key": ,`) into `null`.
///
/// # Examples
///
/// ```
/// use lorekeeper_extractor::json::repair_json;
///
/// assert_eq!(repair_json(r#"["a", "b", ]"#), r#"["a", "b"]"#);
/// assert_eq!(repair_json(r#"{"a": , "b": 1}"#), r#"{"a": null, "b": 1}"#);
/// ```
pub fn repair_json(json: &str) -> String {
    let without_trailing = trailing_comma().replace_all(json, "$1");
    empty_value()
        .replace_all(&without_trailing, ": null,")
        .into_owned()
}

/// Flatten a loosely-typed JSON value into display text
///
/// `null` becomes empty, strings are returned as-is, objects as compact
/// JSON, arrays as their coerced elements joined by `", "`, and other
/// scalars in their usual textual form.
///
/// # Examples
///
/// ```
/// use lorekeeper_extractor::json::coerce;
/// use serde_json::json;
///
/// assert_eq!(coerce(&json!(null)), "");
/// assert_eq!(coerce(&json!({"a": 1})), r#"{"a":1}"#);
/// assert_eq!(coerce(&json!([1, "a"])), "1, a");
/// ```
pub fn coerce(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(_) => value.to_string(),
        Value::Array(items) => items.iter().map(coerce).collect::<Vec<_>>().join(", "),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
    }
}

/// A repaired model response, classified by its top-level shape
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A JSON object
    Object(Map<String, Value>),
    /// A JSON array
    Array(Vec<Value>),
    /// Anything that did not parse as an object or array
    Unparseable(String),
}

impl Decoded {
    /// Repair and parse a recovered JSON substring
    pub fn parse(json: &str) -> Self {
        if json.is_empty() {
            return Decoded::Unparseable("empty input".to_string());
        }
        match serde_json::from_str::<Value>(&repair_json(json)) {
            Ok(Value::Object(map)) => Decoded::Object(map),
            Ok(Value::Array(items)) => Decoded::Array(items),
            Ok(other) => Decoded::Unparseable(format!("expected object or array, got {}", other)),
            Err(e) => Decoded::Unparseable(e.to_string()),
        }
    }

    /// Recover, repair and parse a raw model response
    ///
    /// Tries the preferred bracket kind first and falls back to the other
    /// one, so an object-shaped prompt answered with an array (or the
    /// reverse) still decodes. Returns `None` when neither kind of span is
    /// present at all.
    pub fn from_response(raw: &str, prefer_array: bool) -> Option<Self> {
        let preferred = extract_json(raw, prefer_array);
        let fallback = extract_json(raw, !prefer_array);

        match (preferred.is_empty(), fallback.is_empty()) {
            (true, true) => None,
            (false, true) => Some(Self::parse(&preferred)),
            (true, false) => Some(Self::parse(&fallback)),
            (false, false) => match Self::parse(&preferred) {
                Decoded::Unparseable(_) => Some(Self::parse(&fallback)),
                decoded => Some(decoded),
            },
        }
    }
}

/// A record that can be rebuilt field-by-field from a loose JSON map
///
/// Typed decoding via serde is tried first; when a field has the wrong
/// shape (a nested object where a string was expected, a scalar where a
/// list was expected) the record is rebuilt from the map with [`text`] and
/// [`list`].
pub trait LooseRecord: DeserializeOwned {
    /// Build the record from a map, coercing each field
    fn from_loose(map: &Map<String, Value>) -> Self;
}

/// Coerced text of a field, empty when missing
pub fn text(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(coerce).unwrap_or_default()
}

/// Coerced list of a field
///
/// Arrays yield one string per non-empty element; a scalar yields a
/// single-element list.
pub fn list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(coerce)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(other) => {
            let value = coerce(other);
            if value.is_empty() {
                Vec::new()
            } else {
                vec![value]
            }
        }
    }
}

fn decode_record<T: LooseRecord>(map: Map<String, Value>) -> T {
    match serde_json::from_value::<T>(Value::Object(map.clone())) {
        Ok(record) => record,
        Err(_) => T::from_loose(&map),
    }
}

/// Decode a single record
///
/// An array contributes its first object; an empty array is an error.
pub fn decode_one<T: LooseRecord>(decoded: Decoded) -> Result<T, ExtractorError> {
    match decoded {
        Decoded::Object(map) => Ok(decode_record(map)),
        Decoded::Array(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => Ok(decode_record(map)),
            Some(other) => Err(ExtractorError::Schema(format!(
                "expected an object, got {}",
                other
            ))),
            None => Err(ExtractorError::Schema("model returned an empty array".to_string())),
        },
        Decoded::Unparseable(reason) => Err(ExtractorError::Schema(reason)),
    }
}

/// Decode a list of records
///
/// A lone object counts as a one-record list. Non-object elements are skipped.
pub fn decode_many<T: LooseRecord>(decoded: Decoded) -> Result<Vec<T>, ExtractorError> {
    match decoded {
        Decoded::Object(map) => Ok(vec![decode_record(map)]),
        Decoded::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(decode_record(map)),
                _ => None,
            })
            .collect()),
        Decoded::Unparseable(reason) => Err(ExtractorError::Schema(reason)),
    }
}

/// Decode a flat list of strings, dropping empty entries
pub fn decode_strings(decoded: Decoded) -> Result<Vec<String>, ExtractorError> {
    match decoded {
        Decoded::Array(items) => Ok(items
            .iter()
            .map(coerce)
            .filter(|s| !s.is_empty())
            .collect()),
        Decoded::Object(_) => Err(ExtractorError::Schema(
            "expected an array of strings, got an object".to_string(),
        )),
        Decoded::Unparseable(reason) => Err(ExtractorError::Schema(reason)),
    }
}

/// Longest prefix of `content` that fits in `max_chars` characters
pub fn content_prefix(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &content[..byte_index],
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair {
        #[serde(default)]
        question: String,
        #[serde(default)]
        answer: String,
    }

    impl LooseRecord for Pair {
        fn from_loose(map: &Map<String, Value>) -> Self {
            Self {
                question: text(map, "question"),
                answer: text(map, "answer"),
            }
        }
    }

    #[test]
    fn test_extract_bare_json() {
        assert_eq!(extract_json(r#"[1, 2, 3]"#, true), "[1, 2, 3]");
        assert_eq!(extract_json(r#"  {"a": 1}  "#, false), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_fenced_with_tag() {
        let raw = "```json\n{\"who\": \"Aria\"}\n```";
        assert_eq!(extract_json(raw, false), "{\"who\": \"Aria\"}");
    }

    #[test]
    fn test_extract_fenced_without_tag() {
        let raw = "```\n[\"dragons\", \"gold\"]\n```";
        assert_eq!(extract_json(raw, true), "[\"dragons\", \"gold\"]");
    }

    #[test]
    fn test_extract_json_fence_preferred_over_earlier_fence() {
        let raw = "```text\n[\"wrong\"]\n```\nThen:\n```json\n[\"right\"]\n```";
        assert_eq!(extract_json(raw, true), "[\"right\"]");
    }

    #[test]
    fn test_extract_surrounded_by_prose() {
        let raw = "Here are the entities I found: [{\"name\": \"Aria\"}] Hope this helps.";
        assert_eq!(extract_json(raw, true), "[{\"name\": \"Aria\"}]");
    }

    #[test]
    fn test_extract_without_brackets_is_empty() {
        assert_eq!(extract_json("There is nothing structured here.", true), "");
        assert_eq!(extract_json("There is nothing structured here.", false), "");
    }

    #[test]
    fn test_extract_close_before_open_is_empty() {
        assert_eq!(extract_json("] then [", true), "");
    }

    #[test]
    fn test_extract_unclosed_fence_uses_rest_of_text() {
        let raw = "```json\n[{\"a\": 1}]";
        assert_eq!(extract_json(raw, true), "[{\"a\": 1}]");
    }

    #[test]
    fn test_single_line_fence_is_plain_text() {
        assert_eq!(extract_json("```json {\"a\": 1}```", false), "{\"a\": 1}");
        assert_eq!(
            extract_json("Before [0] ```json [1]```", true),
            "[0] ```json [1]"
        );
    }

    #[test]
    fn test_repair_trailing_commas() {
        assert_eq!(repair_json("[1, 2,]"), "[1, 2]");
        assert_eq!(repair_json("{\"a\": 1,\n}"), "{\"a\": 1}");
        assert_eq!(repair_json("[{\"a\": 1}, ]"), "[{\"a\": 1}]");
    }

    #[test]
    fn test_repair_empty_values() {
        assert_eq!(repair_json(r#"{"a":, "b": 2}"#), r#"{"a": null, "b": 2}"#);
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(&Value::Null), "");
        assert_eq!(coerce(&json!("x")), "x");
        assert_eq!(coerce(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(coerce(&json!([1, "a"])), "1, a");
        assert_eq!(coerce(&json!(true)), "true");
        assert_eq!(coerce(&json!(2.5)), "2.5");
        assert_eq!(coerce(&json!([[1, 2], null, "z"])), "1, 2, , z");
    }

    #[test]
    fn test_decoded_parse_shapes() {
        assert!(matches!(Decoded::parse("{\"a\": 1}"), Decoded::Object(_)));
        assert!(matches!(Decoded::parse("[1,]"), Decoded::Array(_)));
        assert!(matches!(Decoded::parse("[1"), Decoded::Unparseable(_)));
        assert!(matches!(Decoded::parse(""), Decoded::Unparseable(_)));
    }

    #[test]
    fn test_from_response_falls_back_to_array() {
        let raw = "[{\"who\": \"Aria\"}, {\"who\": \"Bren\"}]";
        // Object scan spans both objects and fails to parse; array scan succeeds
        match Decoded::from_response(raw, false) {
            Some(Decoded::Array(items)) => assert_eq!(items.len(), 2),
            other => panic!("unexpected decode: {:?}", other),
        }
        assert!(Decoded::from_response("plain text", false).is_none());
    }

    #[test]
    fn test_decode_one_takes_first_array_element() {
        let pair: Pair = decode_one(Decoded::parse(
            r#"[{"question": "Q1", "answer": "A1"}, {"question": "Q2", "answer": "A2"}]"#,
        ))
        .unwrap();
        assert_eq!(pair.question, "Q1");

        let empty = decode_one::<Pair>(Decoded::Array(vec![]));
        assert!(matches!(empty, Err(ExtractorError::Schema(_))));
    }

    #[test]
    fn test_decode_falls_back_to_loose_fields() {
        let pair: Pair =
            decode_one(Decoded::parse(r#"{"question": {"text": "Q"}, "answer": ["a", "b"]}"#))
                .unwrap();
        assert_eq!(pair.question, r#"{"text":"Q"}"#);
        assert_eq!(pair.answer, "a, b");
    }

    #[test]
    fn test_decode_many_accepts_lone_object_and_skips_scalars() {
        let one: Vec<Pair> = decode_many(Decoded::parse(r#"{"question": "Q"}"#)).unwrap();
        assert_eq!(one.len(), 1);

        let mixed: Vec<Pair> =
            decode_many(Decoded::parse(r#"[{"question": "Q"}, "stray", 3]"#)).unwrap();
        assert_eq!(mixed.len(), 1);

        assert!(decode_many::<Pair>(Decoded::Unparseable("bad".into())).is_err());
    }

    #[test]
    fn test_decode_strings() {
        let words = decode_strings(Decoded::parse(r#"["magic", "", 7, null]"#)).unwrap();
        assert_eq!(words, vec!["magic".to_string(), "7".to_string()]);
        assert!(decode_strings(Decoded::parse(r#"{"a": "b"}"#)).is_err());
    }

    #[test]
    fn test_list_helper() {
        let map = json!({"many": ["a", "", {"k": 1}], "one": "solo", "none": null})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(list(&map, "many"), vec!["a".to_string(), r#"{"k":1}"#.to_string()]);
        assert_eq!(list(&map, "one"), vec!["solo".to_string()]);
        assert!(list(&map, "none").is_empty());
        assert!(list(&map, "missing").is_empty());
    }

    #[test]
    fn test_content_prefix_respects_char_boundaries() {
        assert_eq!(content_prefix("héllo wörld", 4), "héll");
        assert_eq!(content_prefix("short", 100), "short");
        assert_eq!(content_prefix("", 3), "");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: text without any brackets never yields a span
        #[test]
        fn test_no_brackets_no_json(text in "[a-zA-Z0-9 .,!?\n]{0,200}") {
            prop_assert_eq!(extract_json(&text, true), "");
            prop_assert_eq!(extract_json(&text, false), "");
        }

        /// Property: a span, when found, starts and ends with the requested brackets
        #[test]
        fn test_span_is_bracketed(prefix in "[a-z ]{0,20}", body in "[a-z0-9,\" ]{0,40}", suffix in "[a-z ]{0,20}") {
            let raw = format!("{}[{}]{}", prefix, body, suffix);
            let span = extract_json(&raw, true);
            prop_assert!(span.starts_with('['));
            prop_assert!(span.ends_with(']'));
        }

        /// Property: prefixes never exceed the requested char count
        #[test]
        fn test_prefix_bound(text in "\\PC{0,100}", max in 0usize..120) {
            prop_assert!(content_prefix(&text, max).chars().count() <= max);
        }
    }
}
