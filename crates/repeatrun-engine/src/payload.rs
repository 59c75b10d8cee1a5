//! Extraction of a flat field mapping from raw worker replies.
//!
//! Model-backed workers tend to wrap their JSON in markdown code fences or
//! return scalar values as numbers/booleans. This module normalizes such
//! replies into the `field -> string value` mapping the runner validates.

use std::collections::HashMap;

use serde_json::Value;

use crate::worker::WorkerError;

/// Extract a flat JSON object from a reply, tolerating markdown fences.
///
/// Nested objects and arrays are rejected: the payload must serialize to a
/// single CSV row. Scalar values are stringified; nulls become empty
/// strings.
pub fn extract_payload(reply: &str) -> Result<HashMap<String, String>, WorkerError> {
    let cleaned = reply.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| WorkerError::MalformedReply(e.to_string()))?;

    let object = match value {
        Value::Object(map) => map,
        other => {
            return Err(WorkerError::MalformedReply(format!(
                "expected an object, got {other}"
            )))
        }
    };

    let mut payload = HashMap::with_capacity(object.len());
    for (key, value) in object {
        let text = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Object(_) | Value::Array(_) => {
                return Err(WorkerError::MalformedReply(format!(
                    "field '{key}' is not a scalar"
                )))
            }
        };
        payload.insert(key, text);
    }
    Ok(payload)
}
