//! Normalizer property tests — a generated corpus of damaged model output
//! checked against the normalizer's guarantees.
//!
//! Tests verify:
//! - Totality: every required field is present with a schema-valid value
//! - Idempotence: normalizing a normalized record changes nothing
//! - Enumerated fields never leave their allowed sets
//! - Scores stay inside their ranges

use serde_json::Value;

use coordination::normalizer::{normalize, ExtractionMethod, SchemaKind};

const KINDS: [SchemaKind; 3] = [SchemaKind::Critic, SchemaKind::Judge, SchemaKind::Generator];

/// Well-formed payloads, one per schema.
fn seeds() -> Vec<String> {
    vec![
        r#"{"verdict": "revise", "findings": {"tests": ["none added"]}, "must_fix": ["add tests"], "nice_to_have": [], "confidence": 0.4}"#.to_string(),
        r#"{"decision": "merge", "runner_instructions": ["cargo build", "cargo test"], "rationale": "ok", "confidence": 0.75, "risk_assessment": "low", "accuracy_score": 9}"#.to_string(),
        r#"{"agent_id": "generator-1", "approach": "split the parser", "code": "fn parse() {}", "tests": null, "risk_level": "medium", "confidence": 0.5, "tools_used": ["grep"]}"#.to_string(),
    ]
}

/// Damage a payload in the ways models actually do.
fn mutations(seed: &str) -> Vec<String> {
    let mut out = vec![
        seed.to_string(),
        format!("Sure, here you go:\n```json\n{}\n```\nLet me know!", seed),
        format!("My answer is {} and that is final.", seed),
        seed.replacen('}', ",}", 1),
        seed.replace('"', "'"),
        seed.replace("null", "None"),
        seed[..seed.len() / 2].to_string(),
        seed.replace("0.", "1"),
        seed.replace("revise", "needs work")
            .replace("merge", "ship it")
            .replace("medium", "moderate"),
    ];
    out.push(String::new());
    out.push("I have no structured opinion.".to_string());
    out.push("{{{{".to_string());
    out.push("}{".to_string());
    out.push("confidence: high\nverdict: ???\ndecision: maybe".to_string());
    out
}

fn corpus() -> Vec<String> {
    seeds().iter().flat_map(|s| mutations(s)).collect()
}

fn allowed(kind: SchemaKind, field: &str) -> Option<&'static [&'static str]> {
    match (kind, field) {
        (SchemaKind::Critic, "verdict") => Some(&["pass", "revise", "reject"]),
        (SchemaKind::Judge, "decision") => Some(&["accept", "merge", "reject"]),
        (SchemaKind::Judge, "risk_assessment") | (SchemaKind::Generator, "risk_level") => {
            Some(&["low", "medium", "high", "unknown"])
        }
        _ => None,
    }
}

#[test]
fn test_totality_over_damaged_corpus() {
    for text in corpus() {
        for kind in KINDS {
            let record = normalize(&text, kind);
            for field in kind.required_fields() {
                let value = record.fields.get(*field);
                assert!(value.is_some(), "{} missing {} for {:?}", kind, field, text);
                if let Some(values) = allowed(kind, field) {
                    let v = value.and_then(Value::as_str).unwrap_or("<not a string>");
                    assert!(values.contains(&v), "{}.{} = {} for {:?}", kind, field, v, text);
                }
            }
        }
    }
}

#[test]
fn test_scores_stay_in_range() {
    for text in corpus() {
        for kind in KINDS {
            let record = normalize(&text, kind);
            let confidence = record.get_f64("confidence");
            assert!((0.0..=1.0).contains(&confidence), "{} confidence {} for {:?}", kind, confidence, text);
            if kind == SchemaKind::Judge {
                let accuracy = record.get_f64("accuracy_score");
                assert!((0.0..=10.0).contains(&accuracy), "accuracy {} for {:?}", accuracy, text);
            }
        }
    }
}

#[test]
fn test_normalizing_twice_is_a_no_op() {
    for text in corpus() {
        for kind in KINDS {
            let once = normalize(&text, kind);
            let serialized = Value::Object(once.fields.clone()).to_string();
            let twice = normalize(&serialized, kind);
            assert_eq!(twice.method, ExtractionMethod::DirectParse);
            assert_eq!(once.fields, twice.fields, "{} not idempotent for {:?}", kind, text);
        }
    }
}

#[test]
fn test_approving_judgment_always_has_a_step() {
    for text in corpus() {
        let record = normalize(&text, SchemaKind::Judge);
        if matches!(record.get_str("decision"), "accept" | "merge") {
            assert!(!record.get_strings("runner_instructions").is_empty(), "{:?}", text);
        }
    }
}
