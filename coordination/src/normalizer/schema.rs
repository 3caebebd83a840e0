//! Role schemas: default templates, enumerations and value coercion.
//!
//! Every field a schema knows about has a template value. The template's
//! JSON type is the field's type: recovered values are coerced to it, and
//! anything that cannot be coerced falls back to the template value.

use serde_json::{Map, Number, Value};

/// Instruction inserted when a judge accepts but gives no runner steps.
pub const PLACEHOLDER_INSTRUCTION: &str =
    "Apply the accepted proposal and run the project's test suite before merging";

/// Target shape for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Critic,
    Judge,
    Generator,
}

/// An enumerated field: allowed values plus the conservative default.
struct EnumField {
    name: &'static str,
    allowed: &'static [&'static str],
    default: &'static str,
}

/// A numeric field clamped into `[min, max]`.
struct RangeField {
    name: &'static str,
    min: f64,
    max: f64,
}

const RISK_LEVELS: &[&str] = &["low", "medium", "high", "unknown"];

impl SchemaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critic => "critic",
            Self::Judge => "judge",
            Self::Generator => "generator",
        }
    }

    /// Fields every normalized record of this kind carries.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Critic => &["verdict", "findings", "must_fix", "nice_to_have", "confidence"],
            Self::Judge => &[
                "decision",
                "runner_instructions",
                "rationale",
                "confidence",
                "risk_assessment",
                "accuracy_score",
            ],
            Self::Generator => &[
                "agent_id",
                "approach",
                "code",
                "tests",
                "risk_level",
                "confidence",
                "tools_used",
            ],
        }
    }

    /// Default template. Missing keys are always filled from here.
    pub fn template(self) -> Map<String, Value> {
        let value = match self {
            Self::Critic => serde_json::json!({
                "verdict": "revise",
                "findings": {},
                "must_fix": [],
                "nice_to_have": [],
                "confidence": 0.0,
            }),
            Self::Judge => serde_json::json!({
                "decision": "reject",
                "runner_instructions": [],
                "rationale": "",
                "confidence": 0.0,
                "risk_assessment": "unknown",
                "accuracy_score": 0.0,
            }),
            Self::Generator => serde_json::json!({
                "agent_id": "",
                "approach": "",
                "code": "",
                "tests": null,
                "risk_level": "unknown",
                "confidence": 0.0,
                "tools_used": [],
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// Whether `key` belongs to this schema.
    pub fn knows(self, key: &str) -> bool {
        self.required_fields().contains(&key)
    }

    fn enum_fields(self) -> &'static [EnumField] {
        match self {
            Self::Critic => &[EnumField {
                name: "verdict",
                allowed: &["pass", "revise", "reject"],
                default: "revise",
            }],
            Self::Judge => &[
                EnumField {
                    name: "decision",
                    allowed: &["accept", "merge", "reject"],
                    default: "reject",
                },
                EnumField {
                    name: "risk_assessment",
                    allowed: RISK_LEVELS,
                    default: "unknown",
                },
            ],
            Self::Generator => &[EnumField {
                name: "risk_level",
                allowed: RISK_LEVELS,
                default: "unknown",
            }],
        }
    }

    fn range_fields(self) -> &'static [RangeField] {
        match self {
            Self::Critic | Self::Generator => &[RangeField {
                name: "confidence",
                min: 0.0,
                max: 1.0,
            }],
            Self::Judge => &[
                RangeField {
                    name: "confidence",
                    min: 0.0,
                    max: 1.0,
                },
                RangeField {
                    name: "accuracy_score",
                    min: 0.0,
                    max: 10.0,
                },
            ],
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map common spellings onto the canonical enumeration values.
fn canonical_enum_value(field: &str, raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    let mapped = match (field, lowered.as_str()) {
        ("verdict", "approve" | "approved" | "accept" | "accepted" | "passed" | "lgtm") => "pass",
        ("verdict", "request_changes" | "changes_requested" | "needs_revision" | "needs_work") => {
            "revise"
        }
        ("verdict", "rejected" | "fail" | "failed" | "block" | "blocked") => "reject",
        ("decision", "approve" | "approved" | "accepted") => "accept",
        ("decision", "merged") => "merge",
        ("decision", "rejected" | "decline" | "declined") => "reject",
        (_, "moderate" | "med") => "medium",
        (_, "critical" | "severe") => "high",
        (_, "minimal") => "low",
        (_, other) => other,
    };
    mapped.to_string()
}

/// Coerce `value` to the JSON type of `template`. Values already of the
/// right type are returned untouched.
fn coerce_to_template(template: &Value, value: Value) -> Value {
    match (template, value) {
        (Value::String(_), v @ Value::String(_)) => v,
        (Value::String(_), Value::Number(n)) => Value::String(n.to_string()),
        (Value::String(_), Value::Bool(b)) => Value::String(b.to_string()),
        (Value::String(_), Value::Array(items)) => Value::String(
            items
                .into_iter()
                .map(|i| value_to_string(&i))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        (Value::String(_), v @ Value::Object(_)) => Value::String(v.to_string()),

        (Value::Number(_), v @ Value::Number(_)) => v,
        (Value::Number(_), Value::String(s)) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| template.clone()),

        (Value::Array(_), Value::Array(items)) => Value::Array(
            items
                .into_iter()
                .map(|i| match i {
                    s @ Value::String(_) => s,
                    other => Value::String(value_to_string(&other)),
                })
                .collect(),
        ),
        (Value::Array(_), Value::String(s)) => Value::Array(
            split_list(&s).into_iter().map(Value::String).collect(),
        ),

        (Value::Object(_), Value::Object(map)) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, coerce_to_template(&Value::Array(Vec::new()), v)))
                .collect(),
        ),
        (Value::Object(_), v @ (Value::Array(_) | Value::String(_))) => {
            let issues = coerce_to_template(&Value::Array(Vec::new()), v);
            let mut map = Map::new();
            if issues.as_array().is_some_and(|a| !a.is_empty()) {
                map.insert("general".to_string(), issues);
            }
            Value::Object(map)
        }

        // Nullable string field.
        (Value::Null, v @ (Value::Null | Value::String(_))) => v,
        (Value::Null, other) => Value::String(value_to_string(&other)),

        (template, _) => template.clone(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Split a free-text list ("a; b", bullet lines) into items.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(['\n', ';'])
        .map(|item| item.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Merge a recovered map onto the schema template and make every known
/// field type-correct and schema-valid.
pub fn conform(kind: SchemaKind, recovered: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let template = kind.template();
    let mut merged = template.clone();
    for (key, value) in recovered {
        merged.insert(key, value);
    }

    for (key, template_value) in &template {
        if let Some(value) = merged.remove(key) {
            merged.insert(key.clone(), coerce_to_template(template_value, value));
        }
    }

    for field in kind.enum_fields() {
        let current = merged
            .get(field.name)
            .and_then(Value::as_str)
            .map(|s| canonical_enum_value(field.name, s));
        let valid = match current {
            Some(ref v) if field.allowed.contains(&v.as_str()) => v.clone(),
            _ => field.default.to_string(),
        };
        let unchanged = merged.get(field.name).and_then(Value::as_str) == Some(valid.as_str());
        if !unchanged {
            merged.insert(field.name.to_string(), Value::String(valid));
        }
    }

    for field in kind.range_fields() {
        let Some(current) = merged.get(field.name).and_then(Value::as_f64) else {
            continue;
        };
        if !current.is_finite() || current < field.min || current > field.max {
            let clamped = if current.is_finite() {
                current.clamp(field.min, field.max)
            } else {
                field.min
            };
            if let Some(n) = Number::from_f64(clamped) {
                merged.insert(field.name.to_string(), Value::Number(n));
            }
        }
    }

    if kind == SchemaKind::Judge {
        let approving = matches!(
            merged.get("decision").and_then(Value::as_str),
            Some("accept" | "merge")
        );
        let has_steps = merged
            .get("runner_instructions")
            .and_then(Value::as_array)
            .is_some_and(|steps| !steps.is_empty());
        if approving && !has_steps {
            merged.insert(
                "runner_instructions".to_string(),
                Value::Array(vec![Value::String(PLACEHOLDER_INSTRUCTION.to_string())]),
            );
        }
    }

    for field in required {
        if !merged.contains_key(*field) {
            merged.insert(field.to_string(), Value::String(String::new()));
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_templates_cover_required_fields() {
        for kind in [SchemaKind::Critic, SchemaKind::Judge, SchemaKind::Generator] {
            let template = kind.template();
            for field in kind.required_fields() {
                assert!(template.contains_key(*field), "{} missing {}", kind, field);
            }
        }
    }

    #[test]
    fn test_unknown_verdict_becomes_revise() {
        let out = conform(SchemaKind::Critic, obj(json!({"verdict": "maybe"})), &[]);
        assert_eq!(out["verdict"], "revise");
    }

    #[test]
    fn test_unknown_decision_becomes_reject() {
        let out = conform(SchemaKind::Judge, obj(json!({"decision": 42})), &[]);
        assert_eq!(out["decision"], "reject");
    }

    #[test]
    fn test_synonyms_are_canonicalized() {
        let out = conform(SchemaKind::Critic, obj(json!({"verdict": "Request Changes"})), &[]);
        assert_eq!(out["verdict"], "revise");
        let out = conform(
            SchemaKind::Judge,
            obj(json!({"decision": "APPROVED", "risk_assessment": "Moderate"})),
            &[],
        );
        assert_eq!(out["decision"], "accept");
        assert_eq!(out["risk_assessment"], "medium");
    }

    #[test]
    fn test_risk_none_is_not_read_as_low() {
        let out = conform(
            SchemaKind::Judge,
            obj(json!({"decision": "accept", "risk_assessment": "none"})),
            &[],
        );
        assert_eq!(out["risk_assessment"], "unknown");
        let out = conform(SchemaKind::Generator, obj(json!({"risk_level": "None"})), &[]);
        assert_eq!(out["risk_level"], "unknown");
    }

    #[test]
    fn test_accept_without_steps_gets_placeholder() {
        let out = conform(SchemaKind::Judge, obj(json!({"decision": "merge"})), &[]);
        assert_eq!(out["runner_instructions"], json!([PLACEHOLDER_INSTRUCTION]));
    }

    #[test]
    fn test_reject_keeps_empty_steps() {
        let out = conform(SchemaKind::Judge, obj(json!({"decision": "reject"})), &[]);
        assert_eq!(out["runner_instructions"], json!([]));
    }

    #[test]
    fn test_scalar_list_is_split() {
        let out = conform(
            SchemaKind::Critic,
            obj(json!({"must_fix": "- add tests\n- handle errors"})),
            &[],
        );
        assert_eq!(out["must_fix"], json!(["add tests", "handle errors"]));
    }

    #[test]
    fn test_numeric_strings_and_clamping() {
        let out = conform(
            SchemaKind::Judge,
            obj(json!({"confidence": "0.8", "accuracy_score": 42})),
            &[],
        );
        assert_eq!(out["confidence"].as_f64(), Some(0.8));
        assert_eq!(out["accuracy_score"].as_f64(), Some(10.0));
    }

    #[test]
    fn test_findings_from_list() {
        let out = conform(SchemaKind::Critic, obj(json!({"findings": ["no tests"]})), &[]);
        assert_eq!(out["findings"], json!({"general": ["no tests"]}));
    }

    #[test]
    fn test_extra_required_field_is_filled() {
        let out = conform(SchemaKind::Critic, Map::new(), &["summary"]);
        assert_eq!(out["summary"], "");
    }

    #[test]
    fn test_nullable_tests_field() {
        let out = conform(SchemaKind::Generator, obj(json!({"tests": null})), &[]);
        assert!(out["tests"].is_null());
        let out = conform(SchemaKind::Generator, obj(json!({"tests": ["t1", "t2"]})), &[]);
        assert_eq!(out["tests"], "[\"t1\",\"t2\"]");
    }
}
