//! Locating, parsing and validating the JSON object in free-form model output.
//!
//! Models wrap their answer in prose, markdown fences or trailing notes, and
//! sometimes bend the schema (`"skills": "Python"`, `"total_experience_years":
//! "3.5"`). Extraction runs in two passes:
//!
//! 1. a strict scan that walks every `{` in order and tracks nesting depth,
//!    ignoring braces inside string literals; the first balanced span that
//!    parses as a JSON object wins;
//! 2. only if that finds nothing, a greedy span from the first `{` to the
//!    last `}`.
//!
//! The parsed object is then defaulted and coerced field by field against
//! [`SCHEMA`](crate::core::prompt::SCHEMA) so downstream code always sees a
//! fully populated [`ParsedRecord`].

use crate::core::prompt::{FieldKind, PromptSpec};
use crate::domain::model::ParsedRecord;
use crate::utils::error::DocumentError;
use serde_json::{Map, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, raw: &str, spec: &PromptSpec) -> Result<ParsedRecord, DocumentError> {
        let object = locate_object(raw)?;
        build_record(&object, raw, spec)
    }
}

/// Finds the first balanced `{ ... }` span starting at byte `start`, which
/// must point at a `{`. Returns the exclusive end byte index.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn strict_scan(raw: &str) -> Option<Map<String, Value>> {
    raw.match_indices('{').find_map(|(start, _)| {
        let end = balanced_end(raw, start)?;
        parse_object(&raw[start..end])
    })
}

fn locate_object(raw: &str) -> Result<Map<String, Value>, DocumentError> {
    if let Some(object) = strict_scan(raw) {
        return Ok(object);
    }

    let malformed = |reason: String| DocumentError::MalformedJson {
        reason,
        raw: raw.to_string(),
    };

    let first = raw
        .find('{')
        .ok_or_else(|| malformed("no JSON object found in response".to_string()))?;
    let last = raw
        .rfind('}')
        .filter(|&last| last > first)
        .ok_or_else(|| malformed("unterminated JSON object in response".to_string()))?;

    tracing::debug!("strict brace scan found nothing; trying greedy span");

    match serde_json::from_str::<Value>(&raw[first..=last]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(malformed(format!("expected a JSON object, got {}", kind_of(&other)))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn build_record(
    object: &Map<String, Value>,
    raw: &str,
    spec: &PromptSpec,
) -> Result<ParsedRecord, DocumentError> {
    let mut record = ParsedRecord::default();

    for field in spec.fields() {
        let value = object.get(field.name).unwrap_or(&Value::Null);
        let schema_error = |reason: String| DocumentError::Schema {
            field: field.name.to_string(),
            reason,
            raw: raw.to_string(),
        };

        match field.kind {
            FieldKind::Text => {
                let text = coerce_text(value).map_err(schema_error)?;
                match field.name {
                    "name" => record.name = text,
                    "email" => record.email = text,
                    "phone" => record.phone = text,
                    _ => record.address = text,
                }
            }
            FieldKind::List => {
                let list = coerce_list(value).map_err(schema_error)?;
                match field.name {
                    "skills" => record.skills = list,
                    "education" => record.education = list,
                    "experience" => record.experience = list,
                    "certifications" => record.certifications = list,
                    _ => record.links = list,
                }
            }
            FieldKind::Years => {
                record.total_experience_years = coerce_years(value).map_err(schema_error)?;
            }
        }
    }

    Ok(record)
}

fn coerce_text(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(items) => {
            let parts = items
                .iter()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>();
            if parts.len() != items.iter().filter(|v| !v.is_null()).count() {
                return Err("expected a string, got an array of non-strings".to_string());
            }
            Ok((!parts.is_empty()).then(|| parts.join(", ")))
        }
        Value::Object(_) => Err("expected a string, got an object".to_string()),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `{"degree": "MSc", "year": 2020}` → `"degree: MSc, year: 2020"`.
fn render_object(map: &Map<String, Value>) -> String {
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| match v {
            Value::String(s) => format!("{}: {}", k, s),
            other => format!("{}: {}", k, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn coerce_list(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Number(_) | Value::Bool(_) => Ok(scalar_to_string(value).into_iter().collect()),
        Value::Object(map) => Ok(vec![render_object(map)]),
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::Object(map) => Some(render_object(map)),
                Value::Array(_) => Some(item.to_string()),
                scalar => scalar_to_string(scalar),
            })
            .collect()),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_years(text: &str) -> Option<f64> {
    let lowered = text.trim().to_lowercase();
    let number = ["years", "year", "yrs", "yr"]
        .iter()
        .find_map(|suffix| lowered.strip_suffix(suffix))
        .unwrap_or(&lowered)
        .trim();
    if number.is_empty() {
        return Some(0.0);
    }
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn coerce_years(value: &Value) -> Result<f64, String> {
    let years = match value {
        Value::Null => 0.0,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("{} is not representable as a float", n))?,
        Value::String(s) => {
            parse_years(s).ok_or_else(|| format!("'{}' is not a number of years", s))?
        }
        other => return Err(format!("expected a number, got {}", kind_of(other))),
    };

    if years < 0.0 {
        return Err(format!("{} is negative", years));
    }
    let rounded = round2(years);
    if !rounded.is_finite() {
        return Err(format!("{} is out of range", years));
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ReferenceMonth;

    fn spec() -> PromptSpec {
        PromptSpec::new(3000, ReferenceMonth::new(2025, 6).unwrap())
    }

    fn sample_record() -> ParsedRecord {
        ParsedRecord {
            name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            phone: Some("+1 555 0100".to_string()),
            address: None,
            skills: vec!["Python 3, NumPy".to_string(), "Fortran {legacy}".to_string()],
            education: vec!["MSc Oceanography, 2020".to_string()],
            experience: vec!["Research Assistant, 01/2022 - Present".to_string()],
            certifications: vec![],
            links: vec!["https://github.com/jane".to_string()],
            total_experience_years: 3.42,
        }
    }

    #[test]
    fn test_round_trip_with_surrounding_prose() {
        let record = sample_record();
        let json = serde_json::to_string_pretty(&record).unwrap();
        let raw = format!(
            "Sure! Here is the parsed resume {{as requested}}:\n```json\n{}\n```\nLet me know if {{anything}} else is needed.",
            json
        );

        let parsed = ResponseExtractor::new().extract(&raw, &spec()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let raw = format!("Result: {}", serde_json::to_string(&sample_record()).unwrap());
        let extractor = ResponseExtractor::new();
        let first = extractor.extract(&raw, &spec()).unwrap();
        let second = extractor.extract(&raw, &spec()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_links_defaults_to_empty() {
        let raw = r#"{"name": "A", "email": null, "phone": null, "address": null,
            "skills": ["Python"], "education": [], "experience": [],
            "certifications": [], "total_experience_years": 1.0}"#;
        let parsed = ResponseExtractor::new().extract(raw, &spec()).unwrap();
        assert_eq!(parsed.links, Vec::<String>::new());
        assert_eq!(parsed.skills, vec!["Python"]);
    }

    #[test]
    fn test_all_keys_missing_yields_defaults() {
        let parsed = ResponseExtractor::new().extract("{}", &spec()).unwrap();
        assert_eq!(parsed, ParsedRecord::default());
    }

    #[test]
    fn test_no_brace_is_malformed_json() {
        let err = ResponseExtractor::new()
            .extract("I could not parse this resume.", &spec())
            .unwrap_err();
        match err {
            DocumentError::MalformedJson { raw, .. } => {
                assert_eq!(raw, "I could not parse this resume.")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_object_is_malformed_json() {
        let raw = "{\"name\": \"A\", \"skills\": [\"Python\",}";
        let err = ResponseExtractor::new().extract(raw, &spec()).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedJson { .. }));
        assert_eq!(err.raw_response(), Some(raw));
    }

    #[test]
    fn test_strict_scan_ignores_trailing_commentary_with_braces() {
        // a greedy first-{ to last-} span would swallow the note and fail to parse
        let raw = r#"{"name": "A", "skills": ["Go"]} Note: I assumed {remote} work."#;
        let parsed = ResponseExtractor::new().extract(raw, &spec()).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("A"));
        assert_eq!(parsed.skills, vec!["Go"]);
    }

    #[test]
    fn test_strict_scan_skips_non_json_brace_groups() {
        let raw = r#"Template {name} filled: {"name": "B", "links": "https://b.dev"}"#;
        let parsed = ResponseExtractor::new().extract(raw, &spec()).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("B"));
        assert_eq!(parsed.links, vec!["https://b.dev"]);
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_the_scan() {
        let raw = r#"{"name": "C } {", "skills": ["a \" } b"]}"#;
        let parsed = ResponseExtractor::new().extract(raw, &spec()).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("C } {"));
        assert_eq!(parsed.skills, vec!["a \" } b"]);
    }

    #[test]
    fn test_unbalanced_and_invalid_spans() {
        assert!(strict_scan(r#"{"a": 1"#).is_none());
        assert!(strict_scan(r#"} {"name": "D"}"#).is_some());

        let err = ResponseExtractor::new()
            .extract(r#"Here: {"name": "D" oops} done"#, &spec())
            .unwrap_err();
        match err {
            DocumentError::MalformedJson { reason, .. } => assert!(!reason.is_empty()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_list_field_as_single_string_is_wrapped() {
        let raw = r#"{"skills": "Python", "certifications": ""}"#;
        let parsed = ResponseExtractor::new().extract(raw, &spec()).unwrap();
        assert_eq!(parsed.skills, vec!["Python"]);
        assert!(parsed.certifications.is_empty());
    }

    #[test]
    fn test_list_of_objects_is_rendered() {
        let raw = r#"{"education": [{"degree": "BSc Physics", "year": 2018}, null]}"#;
        let parsed = ResponseExtractor::new().extract(raw, &spec()).unwrap();
        assert_eq!(parsed.education, vec!["degree: BSc Physics, year: 2018"]);
    }

    #[test]
    fn test_years_coercion() {
        let extractor = ResponseExtractor::new();
        let years = |raw: &str| extractor.extract(raw, &spec()).map(|r| r.total_experience_years);

        assert_eq!(years(r#"{"total_experience_years": "3.5"}"#).unwrap(), 3.5);
        assert_eq!(years(r#"{"total_experience_years": "2 years"}"#).unwrap(), 2.0);
        assert_eq!(years(r#"{"total_experience_years": 3.41666}"#).unwrap(), 3.42);
        assert_eq!(years(r#"{"total_experience_years": 4}"#).unwrap(), 4.0);
        assert_eq!(years(r#"{"total_experience_years": null}"#).unwrap(), 0.0);
    }

    #[test]
    fn test_uncoercible_years_is_schema_error() {
        let extractor = ResponseExtractor::new();
        for raw in [
            r#"{"total_experience_years": "about five"}"#,
            r#"{"total_experience_years": [1, 2]}"#,
            r#"{"total_experience_years": -1}"#,
            r#"{"total_experience_years": 1e308}"#,
            r#"{"total_experience_years": "1e308 years"}"#,
        ] {
            match extractor.extract(raw, &spec()).unwrap_err() {
                DocumentError::Schema { field, raw: kept, .. } => {
                    assert_eq!(field, "total_experience_years");
                    assert_eq!(kept, raw);
                }
                other => panic!("unexpected error for {}: {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_text_field_coercion() {
        let raw = r#"{"phone": 5550100, "address": ["Oslo", "Norway"]}"#;
        let parsed = ResponseExtractor::new().extract(raw, &spec()).unwrap();
        assert_eq!(parsed.phone.as_deref(), Some("5550100"));
        assert_eq!(parsed.address.as_deref(), Some("Oslo, Norway"));

        let err = ResponseExtractor::new()
            .extract(r#"{"name": {"first": "A"}}"#, &spec())
            .unwrap_err();
        assert!(matches!(err, DocumentError::Schema { .. }));
    }
}
