//! Extraction ladder: ordered, pure `text → Option<object>` functions.
//!
//! Models wrap JSON in prose and markdown, or emit near-JSON with syntax
//! defects. Each rung is tried in order and the first object recovered wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which rung of the ladder recovered the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    DirectParse,
    FencedBlock,
    BraceScan,
    Repaired,
    KeyValueLines,
    /// Nothing recovered; raw text wrapped as `{response, parsed: false}`.
    RawFallback,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectParse => write!(f, "direct_parse"),
            Self::FencedBlock => write!(f, "fenced_block"),
            Self::BraceScan => write!(f, "brace_scan"),
            Self::Repaired => write!(f, "repaired"),
            Self::KeyValueLines => write!(f, "key_value_lines"),
            Self::RawFallback => write!(f, "raw_fallback"),
        }
    }
}

pub type Strategy = fn(&str) -> Option<Map<String, Value>>;

/// The ladder, in the order it is tried.
pub const LADDER: &[(ExtractionMethod, Strategy)] = &[
    (ExtractionMethod::DirectParse, parse_direct),
    (ExtractionMethod::FencedBlock, parse_fenced_blocks),
    (ExtractionMethod::BraceScan, parse_brace_spans),
    (ExtractionMethod::Repaired, parse_repaired),
    (ExtractionMethod::KeyValueLines, parse_key_value_lines),
];

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").expect("valid regex"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));
static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_\-]*)(\s*):"#).expect("valid regex")
});
static NATIVE_TRUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([:\[,]\s*)True\b").expect("valid regex"));
static NATIVE_FALSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([:\[,]\s*)False\b").expect("valid regex"));
static NATIVE_NULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([:\[,]\s*)(?:None|nil|NULL|undefined)\b").expect("valid regex"));
static KEY_VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:[-*]\s+)?\**"?([A-Za-z_][A-Za-z0-9_ \-]{0,40}?)"?\**\s*[:=]\s*(.+?)\s*,?\s*$"#)
        .expect("valid regex")
});

fn as_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    serde_json::from_str::<Value>(text.trim()).ok().and_then(as_object)
}

/// Rung 1: the whole text is a JSON object.
pub fn parse_direct(text: &str) -> Option<Map<String, Value>> {
    parse_object(text)
}

/// Rung 2: a fenced code block contains a JSON object.
pub fn parse_fenced_blocks(text: &str) -> Option<Map<String, Value>> {
    FENCE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .find_map(|m| parse_object(m.as_str()))
}

/// Balanced `{...}` spans, outermost first, skipping braces inside strings.
fn brace_spans(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if depth > 0 => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    spans
}

/// Rung 3: a brace-delimited substring parses as an object.
pub fn parse_brace_spans(text: &str) -> Option<Map<String, Value>> {
    brace_spans(text).into_iter().find_map(parse_object)
}

/// Strip everything outside the first `{` and the last `}`.
fn strip_outer_text(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].to_string())
}

fn remove_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

fn quote_bare_keys(text: &str) -> String {
    BARE_KEY.replace_all(text, "$1\"$2\"$3:").into_owned()
}

fn normalize_literals(text: &str) -> String {
    let text = NATIVE_TRUE.replace_all(text, "${1}true");
    let text = NATIVE_FALSE.replace_all(&text, "${1}false");
    NATIVE_NULL.replace_all(&text, "${1}null").into_owned()
}

/// Single-quoted pseudo-JSON, only when no double quotes are present.
fn swap_single_quotes(text: &str) -> String {
    if text.contains('"') {
        text.to_string()
    } else {
        text.replace('\'', "\"")
    }
}

/// Textual repairs applied in order before re-parsing.
const REPAIRS: &[fn(&str) -> String] = &[
    swap_single_quotes,
    remove_trailing_commas,
    quote_bare_keys,
    normalize_literals,
];

fn repair(candidate: &str) -> String {
    REPAIRS
        .iter()
        .fold(candidate.to_string(), |text, fix| fix(&text))
}

/// Rung 4: repair near-JSON (inside fences first, then the whole text).
pub fn parse_repaired(text: &str) -> Option<Map<String, Value>> {
    let mut candidates: Vec<String> = FENCE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| strip_outer_text(m.as_str()))
        .collect();
    candidates.extend(strip_outer_text(text));
    candidates.iter().find_map(|c| parse_object(&repair(c)))
}

/// Infer a JSON value from a literal right-hand side.
fn infer_literal(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "yes" => return Value::Bool(true),
        "false" | "no" => return Value::Bool(false),
        "null" | "none" | "nil" | "n/a" => return Value::Null,
        _ => {}
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
            return v;
        }
    }
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    Value::String(unquoted.to_string())
}

/// Rung 5: `key: value` lines.
pub fn parse_key_value_lines(text: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for line in text.lines() {
        let Some(caps) = KEY_VALUE_LINE.captures(line) else {
            continue;
        };
        let key = caps[1].trim().to_ascii_lowercase().replace([' ', '-'], "_");
        let value = infer_literal(&caps[2]);
        map.entry(key).or_insert(value);
    }
    (!map.is_empty()).then_some(map)
}
