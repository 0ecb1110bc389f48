//! crates/sleep_coach_core/src/canonical.rs
//!
//! Normalizes arbitrary JSON-compatible values into a stable form so that
//! semantically identical plan inputs always serialize identically. Key order,
//! incidental timestamp formatting, and null-vs-omitted fields are erased here;
//! list element order is handled by the signature builder.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Matches an ISO-8601 date-time: `YYYY-MM-DDTHH:MM:SS`, optional fractional
/// seconds, optional `Z` or `±HH:MM`/`±HHMM` offset. Deliberately a narrow
/// pattern match, not a datetime parser.
static ISO_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?$")
        .expect("ISO datetime pattern is valid")
});

/// Recursively canonicalizes a JSON value.
///
/// - Null, booleans and numbers are returned unchanged.
/// - Strings matching the ISO date-time pattern are truncated to whole-second
///   precision and re-suffixed with `Z`; all other strings pass through.
/// - Arrays keep their element order (content-based sorting is opt-in, see
///   [`crate::signature`]).
/// - Objects drop entries whose value canonicalizes to null, so an omitted key
///   and an explicit `null` hash identically; surviving entries are re-inserted
///   in sorted key order, which makes the serialized form key-order independent.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        Value::String(s) => match normalize_timestamp(s) {
            Some(normalized) => Value::String(normalized),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(entries) => {
            let mut pairs: Vec<(&String, Value)> = entries
                .iter()
                .map(|(key, v)| (key, canonicalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (key, v) in pairs {
                out.insert(key.clone(), v);
            }
            Value::Object(out)
        }
    }
}

/// Serializes an already-canonical value to its compact JSON text.
///
/// serde_json's compact writer emits no insignificant whitespace and preserves
/// Unicode characters verbatim, so equal canonical values always produce
/// byte-identical strings.
pub fn canonical_json(value: &Value) -> String {
    value.to_string()
}

/// Truncates an ISO-8601 date-time string to whole seconds and re-suffixes it
/// with `Z`. Returns `None` for strings that do not match the pattern, which
/// then pass through canonicalization verbatim.
fn normalize_timestamp(s: &str) -> Option<String> {
    ISO_DATETIME
        .captures(s)
        .map(|caps| format!("{}Z", &caps[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_pass_through_unchanged() {
        assert_eq!(canonicalize(&json!(null)), json!(null));
        assert_eq!(canonicalize(&json!(true)), json!(true));
        assert_eq!(canonicalize(&json!(42)), json!(42));
        assert_eq!(canonicalize(&json!(7.5)), json!(7.5));
        assert_eq!(canonicalize(&json!("plain text")), json!("plain text"));
    }

    #[test]
    fn iso_datetime_variants_collapse_to_one_form() {
        let expected = json!("2026-02-18T09:00:00Z");
        assert_eq!(canonicalize(&json!("2026-02-18T09:00:00")), expected);
        assert_eq!(canonicalize(&json!("2026-02-18T09:00:00Z")), expected);
        assert_eq!(canonicalize(&json!("2026-02-18T09:00:00.000Z")), expected);
        assert_eq!(canonicalize(&json!("2026-02-18T09:00:00.123+00:00")), expected);
        assert_eq!(canonicalize(&json!("2026-02-18T09:00:00+0900")), expected);
    }

    #[test]
    fn non_datetime_strings_pass_through_verbatim() {
        // Near misses stay untouched rather than failing.
        assert_eq!(canonicalize(&json!("2026-02-18")), json!("2026-02-18"));
        assert_eq!(
            canonicalize(&json!("2026-02-18T09:00")),
            json!("2026-02-18T09:00")
        );
        assert_eq!(
            canonicalize(&json!("not-a-date T09:00:00Z")),
            json!("not-a-date T09:00:00Z")
        );
    }

    #[test]
    fn object_keys_serialize_sorted() {
        let a: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        assert_eq!(canonical_json(&canonicalize(&a)), r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn null_entries_are_dropped_from_objects() {
        let with_null = json!({"title": "nap", "end": null});
        let without = json!({"title": "nap"});
        assert_eq!(canonicalize(&with_null), canonicalize(&without));
    }

    #[test]
    fn nested_structures_normalize_recursively() {
        let input = json!({
            "events": [{"start": "2026-02-18T09:00:00.500Z", "note": null}],
            "settings": {"today_override": null}
        });
        assert_eq!(
            canonical_json(&canonicalize(&input)),
            r#"{"events":[{"start":"2026-02-18T09:00:00Z"}],"settings":{}}"#
        );
    }

    #[test]
    fn array_order_is_preserved() {
        let input = json!(["b", "a"]);
        assert_eq!(canonicalize(&input), json!(["b", "a"]));
    }

    #[test]
    fn unicode_is_preserved_in_serialization() {
        let input = json!({"title": "会議"});
        assert_eq!(
            canonical_json(&canonicalize(&input)),
            "{\"title\":\"会議\"}"
        );
    }
}
