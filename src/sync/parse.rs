use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::store::SITES_FIELD;

/// Any valid JSON is accepted here; shape is checked by `extract_sites`.
pub fn parse_payload(text: &str) -> Result<Value> {
    let v = serde_json::from_str(text).context("payload is not valid JSON")?;
    Ok(v)
}

/// The payload's `api_site` mapping, if it has one.
pub fn extract_sites(payload: &Value) -> Option<&Map<String, Value>> {
    payload.get(SITES_FIELD).and_then(Value::as_object)
}

pub fn entry_name(entry: &Value) -> &str {
    entry.get("name").and_then(Value::as_str).unwrap_or("")
}

pub fn entry_api(entry: &Value) -> Option<&str> {
    entry.get("api").and_then(Value::as_str)
}
