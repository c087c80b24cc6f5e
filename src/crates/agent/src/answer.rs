//! Terminal structured payload
//!
//! The model's final turn must be a JSON document matching the payload
//! schema; violations are fed back as `validation_failed` guidance.

use llm::SchemaValidator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A column header with display metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnHeader {
    /// Key into each row object
    pub key: String,

    /// Human-readable label
    pub label: String,

    /// Whether the client should offer sorting on this column
    #[serde(default)]
    pub sortable: bool,
}

/// Result metadata attached to the terminal payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Total row count (authoritative even when rows are batched)
    pub total_rows: usize,

    /// Where the data came from: `snapshot`, `live`, or `hybrid`
    pub data_source: String,

    /// Last successful snapshot promotion time, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<String>,
}

/// The terminal payload streamed to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalPayload {
    /// Display hint: `table` or `markdown`
    pub display: String,

    /// Column headers in display order
    pub columns: Vec<ColumnHeader>,

    /// Row objects keyed by column key
    pub rows: Vec<Value>,

    /// Result metadata
    pub metadata: ResultMetadata,
}

/// JSON schema the model's final turn must satisfy
pub fn answer_schema() -> Value {
    json!({
        "type": "object",
        "required": ["display", "columns", "rows", "data_source"],
        "properties": {
            "display": {"type": "string", "enum": ["table", "markdown"]},
            "columns": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["key", "label"],
                    "properties": {
                        "key": {"type": "string"},
                        "label": {"type": "string"},
                        "sortable": {"type": "boolean"}
                    }
                }
            },
            "rows": {"type": "array", "items": {"type": "object"}},
            "data_source": {"type": "string", "enum": ["snapshot", "live", "hybrid"]}
        },
        "additionalProperties": true
    })
}

/// Parse and validate the model's final text into a payload.
///
/// Accepts a bare JSON object or one wrapped in a ```json fence. Returns
/// the violation messages on failure so the model can correct itself.
pub fn parse_final_answer(
    text: &str,
    last_sync_time: Option<String>,
) -> Result<FinalPayload, Vec<String>> {
    let raw = extract_json(text).ok_or_else(|| {
        vec!["final answer must be a JSON object (optionally in a ```json fence)".to_string()]
    })?;

    let validator = SchemaValidator::new(&answer_schema()).map_err(|e| vec![e])?;
    validator.validate(&raw)?;

    let display = raw["display"].as_str().unwrap_or("table").to_string();
    let columns: Vec<ColumnHeader> =
        serde_json::from_value(raw["columns"].clone()).map_err(|e| vec![e.to_string()])?;
    let rows: Vec<Value> = raw["rows"].as_array().cloned().unwrap_or_default();
    let data_source = raw["data_source"].as_str().unwrap_or("snapshot").to_string();

    Ok(FinalPayload {
        display,
        metadata: ResultMetadata {
            total_rows: rows.len(),
            data_source,
            last_sync_time,
        },
        columns,
        rows,
    })
}

fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value.is_object().then_some(value);
    }
    // ```json ... ``` fence
    let start = trimmed.find("```")?;
    let after = &trimmed[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    let inner = after[..end].trim();
    serde_json::from_str::<Value>(inner)
        .ok()
        .filter(|v| v.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_answer() -> String {
        json!({
            "display": "table",
            "columns": [
                {"key": "email", "label": "Email", "sortable": true},
                {"key": "status", "label": "Status"}
            ],
            "rows": [{"email": "kim@acme.com", "status": "active"}],
            "data_source": "snapshot"
        })
        .to_string()
    }

    #[test]
    fn valid_answer_parses() {
        let payload = parse_final_answer(&valid_answer(), Some("2026-01-01T03:00:00Z".to_string()))
            .unwrap();
        assert_eq!(payload.display, "table");
        assert_eq!(payload.metadata.total_rows, 1);
        assert_eq!(payload.metadata.data_source, "snapshot");
        assert_eq!(
            payload.metadata.last_sync_time.as_deref(),
            Some("2026-01-01T03:00:00Z")
        );
    }

    #[test]
    fn fenced_answer_parses() {
        let fenced = format!("Here is the result:\n```json\n{}\n```", valid_answer());
        assert!(parse_final_answer(&fenced, None).is_ok());
    }

    #[test]
    fn schema_violations_are_reported() {
        let bad = json!({"display": "chart", "columns": [], "rows": [], "data_source": "snapshot"})
            .to_string();
        let errors = parse_final_answer(&bad, None).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn prose_is_rejected() {
        let errors = parse_final_answer("The user has three applications.", None).unwrap_err();
        assert!(errors[0].contains("JSON object"));
    }
}
