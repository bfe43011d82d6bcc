//! Runtime record adapters
//!
//! Each runtime writes its own record schema. An adapter is a stateless
//! translator from one raw record to zero or more [`RuntimeEvent`]s:
//!
//! - [`claude::ClaudeAdapter`] - nested transcript records (`assistant`, `user`, `progress`, ...)
//! - [`pi::PiAdapter`] - flat records discriminated by `type`
//!
//! Malformed records never produce partial events; they produce nothing.

pub mod claude;
pub mod pi;

use crate::data::{AgentId, RuntimeEvent, RuntimeKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Maximum length of a serialized tool-argument preview
pub const ARGS_PREVIEW_LEN: usize = 120;

/// Translates raw records of one runtime into canonical events
pub trait RecordAdapter: Send {
    /// Runtime whose records this adapter understands
    fn runtime(&self) -> RuntimeKind;

    /// Translate one raw record. Returned events are in emission order.
    fn process_record(&self, agent_id: AgentId, record: &Value) -> Vec<RuntimeEvent>;
}

/// Adapter configured for a runtime
pub fn adapter_for(runtime: RuntimeKind) -> Box<dyn RecordAdapter> {
    match runtime {
        RuntimeKind::Claude => Box::new(claude::ClaudeAdapter),
        RuntimeKind::Pi => Box::new(pi::PiAdapter),
    }
}

/// Resolve a record's `timestamp` field to epoch millis.
///
/// Numbers are used as-is, strings are parsed as dates, and anything else
/// (including an unparseable string) falls back to the current time.
pub fn resolve_timestamp(timestamp: Option<&Value>) -> i64 {
    match timestamp {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_else(now_millis),
        Some(Value::String(s)) => parse_date_millis(s).unwrap_or_else(now_millis),
        _ => now_millis(),
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse an ISO-style date string, assuming UTC when no offset is given
fn parse_date_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Compact JSON preview of tool arguments, truncated to [`ARGS_PREVIEW_LEN`] chars
pub fn args_preview(args: Option<&Value>) -> Option<String> {
    let args = args.filter(|v| !v.is_null())?;
    let json = serde_json::to_string(args).ok()?;
    Some(truncate_chars(&json, ARGS_PREVIEW_LEN))
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Deserialize any JSON value, keeping it only if it is a string.
///
/// Used for optional fields where a wrong type means "absent" rather
/// than "reject the whole record".
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Deserialize a required string field, rejecting the empty string.
///
/// An empty id cannot be paired with its counterpart event, so it is
/// treated the same as a missing field.
pub(crate) fn non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&s),
            &"a non-empty string",
        ));
    }
    Ok(s)
}
