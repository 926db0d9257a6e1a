//! Response Extractor: pulls a JSON value out of free-form model text.
//!
//! Total: every failure degrades to `{}`. The value is not validated here;
//! callers coerce it field by field.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

// Removes markers anywhere in the text, including inside JSON string values.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:json)?").expect("code fence pattern"));
static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\{.*\}|\[.*\])").expect("json block pattern"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([\]}])").expect("trailing comma pattern"));
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1F]+").expect("control char pattern"));

/// How the extracted value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The JSON block parsed as-is.
    Parsed,
    /// The JSON block parsed after trailing-comma / control-char repair.
    Repaired,
    /// The envelope carried no text; defaulted to `{}`.
    MissingText,
    /// No `{...}` or `[...]` block in the text; defaulted to `{}`.
    NoJson,
    /// A block was found but would not parse even after repair; defaulted to `{}`.
    ParseFailed,
}

impl ExtractOutcome {
    pub fn is_degraded(self) -> bool {
        !matches!(self, ExtractOutcome::Parsed | ExtractOutcome::Repaired)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    pub outcome: ExtractOutcome,
}

impl Extracted {
    fn empty(outcome: ExtractOutcome) -> Self {
        Self {
            value: json!({}),
            outcome,
        }
    }
}

/// Extracts the JSON payload from a raw provider response, defaulting to `{}`,
/// and reports whether the value was recovered with a default.
pub fn extract_payload(response: &Value) -> Extracted {
    match response_text(response) {
        Some(text) => extract_from_text(text),
        None => Extracted::empty(ExtractOutcome::MissingText),
    }
}

/// Locates the model text inside a provider envelope.
fn response_text(response: &Value) -> Option<&str> {
    if let Some(text) = response.as_str() {
        return Some(text);
    }
    response
        .pointer("/candidates/0/content/parts/0/text")
        .or_else(|| response.pointer("/responses/0/candidates/0/content/parts/0/text"))
        .and_then(Value::as_str)
}

pub fn extract_from_text(text: &str) -> Extracted {
    let cleaned = CODE_FENCE.replace_all(text, "");
    let cleaned = cleaned.trim();

    let Some(block) = JSON_BLOCK.find(cleaned) else {
        warn!("No JSON block detected in model response");
        return Extracted::empty(ExtractOutcome::NoJson);
    };
    let block = block.as_str();

    if let Ok(value) = serde_json::from_str::<Value>(block) {
        return Extracted {
            value,
            outcome: ExtractOutcome::Parsed,
        };
    }

    let repaired = TRAILING_COMMA.replace_all(block, "$1");
    let repaired = CONTROL_CHARS.replace_all(&repaired, "");

    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => Extracted {
            value,
            outcome: ExtractOutcome::Repaired,
        },
        Err(e) => {
            warn!("Model JSON failed to parse after repair ({e}); using empty object");
            Extracted::empty(ExtractOutcome::ParseFailed)
        }
    }
}
