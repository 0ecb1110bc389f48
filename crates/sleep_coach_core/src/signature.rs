//! crates/sleep_coach_core/src/signature.rs
//!
//! Builds the deterministic fingerprint used as the plan cache key. Two plan
//! requests that differ only in key order, list element order, or incidental
//! timestamp formatting must produce the same fingerprint; any material change
//! to a value must produce a different one.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::canonical::{canonical_json, canonicalize};

/// Computes the 64-hex-char SHA-256 fingerprint over the canonicalized plan
/// inputs.
///
/// Calendar events are re-sorted by their `start` field, sleep logs by their
/// `date` field; elements without the field (or non-object elements) sort by
/// their full canonical JSON text. `today_date` is folded in as a plain string
/// so a request on a new calendar day never resolves to yesterday's cache row;
/// `None` and an empty string are equivalent.
///
/// Pure function: no I/O, no shared state, safe to call concurrently.
pub fn build_signature(
    calendar_events: &[Value],
    sleep_logs: &[Value],
    settings: &Map<String, Value>,
    today_date: Option<&str>,
) -> String {
    // Inserted in sorted key order so the serialized payload is key-sorted.
    let mut payload = Map::new();
    payload.insert(
        "calendar_events".to_string(),
        Value::Array(sorted_canonical_list(calendar_events, "start")),
    );
    payload.insert(
        "settings".to_string(),
        canonicalize(&Value::Object(settings.clone())),
    );
    payload.insert(
        "sleep_logs".to_string(),
        Value::Array(sorted_canonical_list(sleep_logs, "date")),
    );
    payload.insert(
        "today_date".to_string(),
        Value::String(today_date.unwrap_or_default().to_string()),
    );

    let serialized = canonical_json(&Value::Object(payload));
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonicalizes every element of a list, then sorts the result by a
/// content-derived key so client-supplied ordering cannot change the
/// fingerprint.
///
/// The primary sort key is the canonicalized `key_field` value (its raw text
/// for strings, its JSON text otherwise); elements without the field fall back
/// to their full canonical JSON text. Ties are broken by the full canonical
/// JSON text, which yields a stable total order even for equal `start` values.
fn sorted_canonical_list(items: &[Value], key_field: &str) -> Vec<Value> {
    let mut keyed: Vec<(String, String, Value)> = items
        .iter()
        .map(|item| {
            let canonical = canonicalize(item);
            let serialized = canonical_json(&canonical);
            let primary = match &canonical {
                Value::Object(map) => match map.get(key_field) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => canonical_json(other),
                    None => serialized.clone(),
                },
                _ => serialized.clone(),
            };
            (primary, serialized, canonical)
        })
        .collect();
    keyed.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    keyed.into_iter().map(|(_, _, value)| value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn events(values: Value) -> Vec<Value> {
        values.as_array().expect("array fixture").clone()
    }

    fn settings(value: Value) -> Map<String, Value> {
        value.as_object().expect("object fixture").clone()
    }

    #[test]
    fn same_input_produces_same_signature() {
        let cal = events(json!([{"title": "会議", "start": "2026-02-18T10:00:00"}]));
        let logs = events(json!([{"date": "2026-02-17", "hours": 7}]));
        let s = settings(json!({"timezone": "Asia/Tokyo"}));
        let h1 = build_signature(&cal, &logs, &s, None);
        let h2 = build_signature(&cal, &logs, &s, None);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn empty_inputs_still_produce_a_valid_digest() {
        let h = build_signature(&[], &[], &Map::new(), None);
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, build_signature(&[], &[], &Map::new(), None));
    }

    #[test]
    fn each_input_contributes_to_the_digest() {
        let base = build_signature(&[], &[], &Map::new(), None);
        let with_cal = build_signature(&events(json!([{"a": 1}])), &[], &Map::new(), None);
        let with_logs = build_signature(&[], &events(json!([{"b": 2}])), &Map::new(), None);
        let with_settings = build_signature(&[], &[], &settings(json!({"c": 3})), None);
        let all = [&base, &with_cal, &with_logs, &with_settings];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn map_key_order_is_irrelevant() {
        let cal1 = events(serde_json::from_str(r#"[{"z": 1, "a": 2}]"#).unwrap());
        let cal2 = events(serde_json::from_str(r#"[{"a": 2, "z": 1}]"#).unwrap());
        assert_eq!(
            build_signature(&cal1, &[], &Map::new(), None),
            build_signature(&cal2, &[], &Map::new(), None)
        );
    }

    #[test]
    fn list_element_order_is_irrelevant() {
        let cal1 = events(json!([
            {"title": "B", "start": "2026-02-19T10:00:00"},
            {"title": "A", "start": "2026-02-18T09:00:00"},
        ]));
        let cal2 = events(json!([
            {"title": "A", "start": "2026-02-18T09:00:00"},
            {"title": "B", "start": "2026-02-19T10:00:00"},
        ]));
        let logs1 = events(json!([
            {"date": "2026-02-18", "score": 80},
            {"date": "2026-02-17", "score": 70},
        ]));
        let logs2 = events(json!([
            {"date": "2026-02-17", "score": 70},
            {"date": "2026-02-18", "score": 80},
        ]));
        assert_eq!(
            build_signature(&cal1, &[], &Map::new(), None),
            build_signature(&cal2, &[], &Map::new(), None)
        );
        assert_eq!(
            build_signature(&[], &logs1, &Map::new(), None),
            build_signature(&[], &logs2, &Map::new(), None)
        );
    }

    #[test]
    fn equal_start_values_sort_deterministically() {
        // Same start, different titles: ordering falls back to the full
        // canonical JSON text, so any permutation hashes the same.
        let cal1 = events(json!([
            {"title": "B", "start": "2026-02-18T09:00:00"},
            {"title": "A", "start": "2026-02-18T09:00:00"},
        ]));
        let cal2 = events(json!([
            {"title": "A", "start": "2026-02-18T09:00:00"},
            {"title": "B", "start": "2026-02-18T09:00:00"},
        ]));
        assert_eq!(
            build_signature(&cal1, &[], &Map::new(), None),
            build_signature(&cal2, &[], &Map::new(), None)
        );
    }

    #[test]
    fn changing_any_scalar_leaf_changes_the_signature() {
        let cal = events(json!([{"title": "gym", "start": "2026-02-18T09:00:00"}]));
        let logs = events(json!([{"date": "2026-02-17", "score": 80}]));
        let s = settings(json!({"goal_hours": 7}));
        let base = build_signature(&cal, &logs, &s, Some("2026-02-20"));

        let cal2 = events(json!([{"title": "run", "start": "2026-02-18T09:00:00"}]));
        assert_ne!(base, build_signature(&cal2, &logs, &s, Some("2026-02-20")));

        let logs2 = events(json!([{"date": "2026-02-17", "score": 81}]));
        assert_ne!(base, build_signature(&cal, &logs2, &s, Some("2026-02-20")));

        let s2 = settings(json!({"goal_hours": 8}));
        assert_ne!(base, build_signature(&cal, &logs, &s2, Some("2026-02-20")));
    }

    #[test]
    fn today_date_crossing_a_day_boundary_changes_the_signature() {
        let s = settings(json!({"goal_hours": 7}));
        assert_ne!(
            build_signature(&[], &[], &s, Some("2026-02-20")),
            build_signature(&[], &[], &s, Some("2026-02-21"))
        );
    }

    #[test]
    fn absent_today_date_equals_empty_string() {
        assert_eq!(
            build_signature(&[], &[], &Map::new(), None),
            build_signature(&[], &[], &Map::new(), Some(""))
        );
    }

    #[test]
    fn null_today_override_equals_omitted_key() {
        let with_null = settings(json!({"goal_hours": 7, "today_override": null}));
        let without = settings(json!({"goal_hours": 7}));
        assert_eq!(
            build_signature(&[], &[], &with_null, None),
            build_signature(&[], &[], &without, None)
        );
    }

    #[test]
    fn today_override_inside_settings_changes_the_signature() {
        let with_override = settings(json!({
            "goal_hours": 7,
            "today_override": {
                "date": "2026-02-20",
                "sleep_hour": 23,
                "sleep_minute": 30,
                "wake_hour": 7,
                "wake_minute": 0,
            }
        }));
        let without = settings(json!({"goal_hours": 7}));
        assert_ne!(
            build_signature(&[], &[], &with_override, None),
            build_signature(&[], &[], &without, None)
        );
    }

    #[test]
    fn timestamp_formatting_does_not_change_the_signature() {
        let cal1 = events(json!([
            {"title": "A", "start": "2026-02-18T09:00:00.000Z", "end": "2026-02-18T10:00:00Z"}
        ]));
        let cal2 = events(json!([
            {"title": "A", "start": "2026-02-18T09:00:00.123+00:00", "end": "2026-02-18T10:00:00.000Z"}
        ]));
        assert_eq!(
            build_signature(&cal1, &[], &Map::new(), None),
            build_signature(&cal2, &[], &Map::new(), None)
        );
    }
}
