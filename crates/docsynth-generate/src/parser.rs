use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use docsynth_core::{AnalysisResult, Confidence};

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").ok())
        .as_ref()
}

/// Contents of the first Markdown code fence, or the trimmed text itself.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    fence_regex()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str())
        .unwrap_or(trimmed)
}

fn outermost(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse an entity payload into raw JSON records.
///
/// A single object where an array is expected counts as one record.
pub fn parse_entity_payload(text: &str) -> Result<Vec<Value>, String> {
    let body = strip_code_fences(text);

    if let Some(array) = outermost(body, '[', ']') {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(array) {
            return Ok(items);
        }
    }
    if let Some(object) = outermost(body, '{', '}') {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(object) {
            return Ok(vec![value]);
        }
    }

    Err(format!("no JSON array found in payload: {}", preview(body)))
}

/// Extract the requested fields from one raw record.
///
/// Strings are trimmed, numbers and booleans become their string form, and
/// extra keys are dropped. Missing, empty, null or nested values are errors.
pub fn record_fields(value: &Value, fields: &[String]) -> Result<BTreeMap<String, String>, String> {
    let object = value
        .as_object()
        .ok_or_else(|| "record is not a JSON object".to_string())?;

    let mut out = BTreeMap::new();
    for field in fields {
        let raw = object
            .get(field)
            .ok_or_else(|| format!("missing field '{field}'"))?;
        let text = scalar_to_string(raw)
            .ok_or_else(|| format!("field '{field}' is not a scalar value"))?;
        if text.is_empty() {
            return Err(format!("field '{field}' is empty"));
        }
        out.insert(field.clone(), text);
    }
    Ok(out)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse an analysis payload into an [`AnalysisResult`].
pub fn parse_analysis_payload(text: &str) -> Result<AnalysisResult, String> {
    let body = strip_code_fences(text);
    let object_text = outermost(body, '{', '}')
        .ok_or_else(|| format!("no JSON object found in payload: {}", preview(body)))?;
    let value: Value = serde_json::from_str(object_text).map_err(|err| err.to_string())?;
    let object = value
        .as_object()
        .ok_or_else(|| "analysis payload is not a JSON object".to_string())?;

    let required = |key: &str| -> Result<String, String> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| format!("missing or empty '{key}'"))
    };

    let document_type = required("document_type")?;
    let detected_locale = required("detected_language")?;
    let confidence_text = required("confidence")?;
    let confidence = Confidence::parse(&confidence_text)
        .ok_or_else(|| format!("unrecognised confidence '{confidence_text}'"))?;

    let mut extracted_entities = BTreeMap::new();
    if let Some(entities) = object.get("extracted_entities").and_then(Value::as_object) {
        for (field, value) in entities {
            if let Some(text) = scalar_to_string(value).filter(|text| !text.is_empty()) {
                extracted_entities.insert(field.trim().to_string(), text);
            }
        }
    }

    Ok(AnalysisResult {
        document_type,
        detected_locale,
        confidence,
        extracted_entities,
    })
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(80).collect();
    if text.chars().count() > 80 {
        out.push_str("...");
    }
    out
}
