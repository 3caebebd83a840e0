//! Response Normalizer — structured records out of unreliable model text.
//!
//! ```text
//! raw text ─► direct parse ─► fenced blocks ─► brace scan ─► repairs ─► key: value lines
//!                 │ first object recovered wins                                │
//!                 ▼                                                            ▼ nothing
//!          conform to schema template                       {response: <text>, parsed: false}
//!          (fill defaults, coerce types, canonical enums)
//! ```
//!
//! There is no failure path: the result always carries every required field
//! with a schema-valid value. The worst case is annotated `parsed: false`.

pub mod schema;
pub mod strategies;

use serde_json::{Map, Value};
use tracing::debug;

pub use schema::{conform, SchemaKind, PLACEHOLDER_INSTRUCTION};
pub use strategies::{ExtractionMethod, LADDER};

/// A normalized model response.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub fields: Map<String, Value>,
    pub method: ExtractionMethod,
}

impl NormalizedRecord {
    /// Whether any structure was recovered from the text.
    pub fn parsed(&self) -> bool {
        self.method != ExtractionMethod::RawFallback
    }

    pub fn get_str(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or("")
    }

    pub fn get_f64(&self, key: &str) -> f64 {
        self.fields.get(key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn get_strings(&self, key: &str) -> Vec<String> {
        string_list(self.fields.get(key))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn recover(text: &str, kind: SchemaKind) -> (Map<String, Value>, ExtractionMethod) {
    for (method, strategy) in LADDER {
        let Some(map) = strategy(text) else {
            continue;
        };
        // Line extraction fires on any "word: text" prose; only keep it
        // when it produced something this schema recognises.
        if *method == ExtractionMethod::KeyValueLines && !map.keys().any(|k| kind.knows(k)) {
            continue;
        }
        return (map, *method);
    }

    let mut raw = Map::new();
    raw.insert("response".to_string(), Value::String(text.to_string()));
    raw.insert("parsed".to_string(), Value::Bool(false));
    (raw, ExtractionMethod::RawFallback)
}

/// Normalize `text` against `kind`, guaranteeing `required` fields on top of
/// the schema's own.
pub fn normalize_with(text: &str, kind: SchemaKind, required: &[&str]) -> NormalizedRecord {
    let (recovered, method) = recover(text, kind);
    debug!(schema = %kind, method = %method, "normalized model response");
    NormalizedRecord {
        fields: conform(kind, recovered, required),
        method,
    }
}

/// Normalize `text` against the schema's own required fields.
pub fn normalize(text: &str, kind: SchemaKind) -> NormalizedRecord {
    normalize_with(text, kind, kind.required_fields())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_well_formed_payload_is_unchanged() {
        let payload = json!({
            "verdict": "pass",
            "findings": {"style": ["long function"]},
            "must_fix": [],
            "nice_to_have": ["rename x"],
            "confidence": 0.9
        });
        let record = normalize(&payload.to_string(), SchemaKind::Critic);
        assert_eq!(record.method, ExtractionMethod::DirectParse);
        assert_eq!(record.into_value(), payload);
    }

    #[test]
    fn test_markdown_wrapped_json() {
        let text = "My review:\n\n```json\n{\"verdict\": \"revise\", \"must_fix\": [\"add tests\"]}\n```";
        let record = normalize(text, SchemaKind::Critic);
        assert_eq!(record.method, ExtractionMethod::FencedBlock);
        assert_eq!(record.get_str("verdict"), "revise");
        assert_eq!(record.get_strings("must_fix"), vec!["add tests"]);
        assert_eq!(record.fields["nice_to_have"], json!([]));
    }

    #[test]
    fn test_prose_falls_back_to_raw() {
        let record = normalize("I could not decide, sorry.", SchemaKind::Judge);
        assert!(!record.parsed());
        assert_eq!(record.fields["parsed"], false);
        assert_eq!(record.get_str("response"), "I could not decide, sorry.");
        assert_eq!(record.get_str("decision"), "reject");
        assert_eq!(record.get_str("risk_assessment"), "unknown");
    }

    #[test]
    fn test_prose_with_unrelated_colons_is_not_structured() {
        let record = normalize("Note: I looked at it\nSummary: fine", SchemaKind::Critic);
        assert!(!record.parsed());
        assert_eq!(record.get_str("verdict"), "revise");
    }

    #[test]
    fn test_key_value_response() {
        let record = normalize("decision: merge\naccuracy_score: 8.5", SchemaKind::Judge);
        assert_eq!(record.method, ExtractionMethod::KeyValueLines);
        assert_eq!(record.get_str("decision"), "merge");
        assert_eq!(record.get_f64("accuracy_score"), 8.5);
        assert_eq!(record.get_strings("runner_instructions"), vec![PLACEHOLDER_INSTRUCTION]);
    }

    #[test]
    fn test_malformed_braces_still_total() {
        for text in ["", "{", "}{", "{{{", "{\"verdict\": ", "```json\n{oops\n```"] {
            let record = normalize(text, SchemaKind::Critic);
            for field in SchemaKind::Critic.required_fields() {
                assert!(record.fields.contains_key(*field), "{:?} missing {}", text, field);
            }
            assert_eq!(record.get_str("verdict"), "revise");
        }
    }

    #[test]
    fn test_extra_required_fields() {
        let record = normalize_with("{}", SchemaKind::Generator, &["agent_id", "summary"]);
        assert!(record.parsed());
        assert_eq!(record.get_str("summary"), "");
        assert_eq!(record.get_str("risk_level"), "unknown");
    }
}
