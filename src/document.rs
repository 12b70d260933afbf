use crate::errors::{AppError, AppResult};
use crate::models::{StateDocument, DEFAULT_DOCUMENT};
use serde_json::{Map, Value};

/// Fresh, independent copy of the hardcoded default document.
pub fn reset() -> StateDocument {
    DEFAULT_DOCUMENT.clone()
}

/// Turns whatever the store returned into a schema-current document.
///
/// Absent (or `null`) input yields the defaults. An object has every missing
/// top-level field filled in from the defaults; fields already present are
/// kept as stored, malformed or not, and unknown fields pass through.
pub fn materialize(loaded: Option<Value>) -> AppResult<StateDocument> {
    let migrated = materialize_value(loaded)?;
    serde_json::from_value(migrated).map_err(|error| AppError::MalformedDocument(error.to_string()))
}

pub fn materialize_value(loaded: Option<Value>) -> AppResult<Value> {
    let defaults = serde_json::to_value(&*DEFAULT_DOCUMENT)?;
    match loaded {
        None | Some(Value::Null) => Ok(defaults),
        Some(Value::Object(mut stored)) => {
            if let Value::Object(default_map) = defaults {
                let added = fill_missing(&mut stored, default_map);
                if !added.is_empty() {
                    tracing::info!(fields = ?added, "migrated stored document with default fields");
                }
            }
            Ok(Value::Object(stored))
        }
        Some(other) => Err(AppError::MalformedDocument(format!(
            "stored document must be an object, found {}",
            json_type_name(&other)
        ))),
    }
}

fn fill_missing(target: &mut Map<String, Value>, defaults: Map<String, Value>) -> Vec<String> {
    let mut added = Vec::new();
    for (key, value) in defaults {
        if !target.contains_key(&key) {
            added.push(key.clone());
            target.insert(key, value);
        }
    }
    added
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{materialize, materialize_value, reset};
    use crate::errors::AppError;
    use crate::models::Notes;
    use serde_json::json;

    #[test]
    fn absent_document_materializes_to_defaults() {
        let doc = materialize(None).expect("materialize");
        assert_eq!(doc, reset());
        assert_eq!(doc.links.len(), 3);
        assert_eq!(doc.templates.len(), 3);
        assert_eq!(doc.checklist.len(), 3);
        assert_eq!(doc.notes, Notes::default());
    }

    #[test]
    fn mutating_one_materialized_copy_leaves_defaults_alone() {
        let mut first = materialize(None).expect("first");
        let second = materialize(None).expect("second");

        first.links[0].label = "Changed".to_string();
        first.checklist[1].done = true;
        first.notes.domain = "example.org".to_string();

        assert_eq!(second, reset());
        assert_eq!(reset().links[0].label, "Ticket Queue");
        assert!(!reset().checklist[1].done);
    }

    #[test]
    fn document_without_notes_gets_default_notes_and_keeps_collections() {
        let stored = json!({
            "links": [{ "label": "Only", "value": "https://only.example", "meta": "" }],
            "templates": [],
            "checklist": [{ "label": "One", "done": true }]
        });

        let doc = materialize(Some(stored)).expect("materialize");
        assert_eq!(doc.notes, Notes::default());
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].label, "Only");
        assert!(doc.templates.is_empty());
        assert_eq!(doc.checklist.len(), 1);
        assert!(doc.checklist[0].done);
    }

    #[test]
    fn present_fields_are_never_overwritten_and_unknown_fields_pass_through() {
        let stored = json!({
            "links": "not a list",
            "futureField": { "enabled": true }
        });

        let merged = materialize_value(Some(stored)).expect("merge");
        assert_eq!(merged["links"], "not a list");
        assert_eq!(merged["futureField"]["enabled"], true);
        assert!(merged["notes"].is_object());
        assert!(merged["templates"].is_array());

        let err = materialize(Some(merged)).expect_err("malformed links");
        assert!(matches!(err, AppError::MalformedDocument(_)));
    }

    #[test]
    fn unknown_fields_survive_materialize() {
        let mut stored = serde_json::to_value(reset()).expect("value");
        stored["futureField"] = json!([1, 2, 3]);

        let doc = materialize(Some(stored)).expect("materialize");
        assert_eq!(doc.extra.get("futureField"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn null_is_treated_as_absent_and_scalars_are_rejected() {
        assert_eq!(materialize(Some(json!(null))).expect("null"), reset());
        assert!(matches!(
            materialize(Some(json!(42))),
            Err(AppError::MalformedDocument(_))
        ));
    }
}
