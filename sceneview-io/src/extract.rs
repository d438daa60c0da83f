//! Locating a scene description embedded somewhere inside a fetched payload
//!
//! Payloads served by model stores wrap the scene in arbitrary envelopes:
//! nested objects, arrays of records, or a JSON document serialized into a
//! string field. The search below walks all of those.

use serde_json::Value;
use std::borrow::Cow;

/// Nesting depth beyond which the search gives up
const MAX_DEPTH: usize = 64;

/// Whether `value` itself is an object-format scene description
pub fn is_scene_description(value: &Value) -> bool {
    let format = value
        .get("metadata")
        .and_then(|metadata| metadata.get("type"))
        .and_then(Value::as_str);
    format == Some("Object") && value.get("object").is_some_and(Value::is_object)
}

/// Find the first scene description in `payload`, depth-first.
///
/// Strings that themselves hold a JSON document are parsed and searched, in
/// which case the returned value is owned.
pub fn find_scene_json(payload: &Value) -> Option<Cow<'_, Value>> {
    find_matching(payload, &is_scene_description, 0)
}

/// Depth-first search for the first value accepted by `matches`
pub fn find_matching<'a>(
    value: &'a Value,
    matches: &dyn Fn(&Value) -> bool,
    depth: usize,
) -> Option<Cow<'a, Value>> {
    if depth > MAX_DEPTH {
        return None;
    }
    if matches(value) {
        return Some(Cow::Borrowed(value));
    }
    match value {
        Value::Object(map) => map
            .values()
            .find_map(|child| find_matching(child, matches, depth + 1)),
        Value::Array(items) => items
            .iter()
            .find_map(|child| find_matching(child, matches, depth + 1)),
        Value::String(text) => embedded_document(text).and_then(|parsed| {
            find_matching(&parsed, matches, depth + 1).map(|found| Cow::Owned(found.into_owned()))
        }),
        _ => None,
    }
}

fn embedded_document(text: &str) -> Option<Value> {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scene() -> Value {
        json!({
            "metadata": { "version": 4.5, "type": "Object" },
            "object": { "type": "Group", "uuid": "root" }
        })
    }

    #[test]
    fn test_top_level_description() {
        let payload = scene();
        let found = find_scene_json(&payload).unwrap();
        assert!(matches!(found, Cow::Borrowed(_)));
        assert_eq!(found["object"]["uuid"], "root");
    }

    #[test]
    fn test_nested_in_envelope() {
        let payload = json!({
            "status": "ok",
            "items": [ { "kind": "note" }, { "kind": "model", "body": scene() } ]
        });
        let found = find_scene_json(&payload).unwrap();
        assert_eq!(found["object"]["type"], "Group");
    }

    #[test]
    fn test_serialized_into_string_field() {
        let payload = json!({ "data": { "model": scene().to_string() } });
        let found = find_scene_json(&payload).unwrap();
        assert!(matches!(found, Cow::Owned(_)));
        assert_eq!(found["object"]["uuid"], "root");
    }

    #[test]
    fn test_other_metadata_types_are_ignored() {
        let payload = json!({
            "metadata": { "type": "Geometry" },
            "object": { "type": "Mesh" }
        });
        assert!(find_scene_json(&payload).is_none());
        assert!(find_scene_json(&json!("not json")).is_none());
        assert!(find_scene_json(&json!(null)).is_none());
    }
}
