//! Input record decoding and labeling.

use contracts::{LabelId, SyncError};
use serde_json::Value;

/// Decode one input line
///
/// Blank lines yield `Ok(None)`.
pub fn parse_record(line_no: u64, line: &str) -> Result<Option<Value>, SyncError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| SyncError::record(line_no, e.to_string()))
}

/// Label of a record, read from `field`
///
/// Strings are used as-is; numbers and booleans by their JSON rendering.
/// Anything else (missing, null, arrays, objects) has no label.
pub fn label_of(record: &Value, field: &str) -> Option<LabelId> {
    match record.get(field)? {
        Value::String(s) => Some(LabelId::from(s.as_str())),
        Value::Number(n) => Some(LabelId::from(n.to_string())),
        Value::Bool(b) => Some(LabelId::from(b.to_string())),
        _ => None,
    }
}
