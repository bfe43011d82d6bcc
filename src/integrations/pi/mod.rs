//! Pi telemetry adapter
//!
//! Pi records are already flat, so translation is mostly one-to-one. Tool
//! names are normalized to the capitalized names Claude uses, and message
//! streaming is surfaced as a synthetic "Typing" tool so the UI shows the
//! agent as busy while text is generated.

pub mod records;

use super::{args_preview, resolve_timestamp, RecordAdapter};
use crate::data::{AgentId, EventPayload, RuntimeEvent, RuntimeKind, ToolStatus};
use once_cell::sync::Lazy;
use records::{error_is_set, PiRecord};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Tool name of the synthetic streaming tool
pub const TYPING_TOOL: &str = "Typing";

/// Pi's lowercase tool names mapped to the canonical names
static TOOL_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("read", "Read"),
        ("write", "Write"),
        ("edit", "Edit"),
        ("bash", "Bash"),
        ("grep", "Grep"),
        ("find", "Find"),
        ("ls", "Ls"),
    ])
});

/// Normalize a Pi tool name; names outside the table pass through unchanged
pub fn normalize_tool_name(name: &str) -> String {
    TOOL_NAMES
        .get(name.to_lowercase().as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Tool call id shared by a streaming start/end pair
fn streaming_call_id(agent_id: AgentId) -> String {
    format!("streaming-{}", agent_id)
}

/// Stateless translator for Pi telemetry records
#[derive(Debug, Clone, Copy, Default)]
pub struct PiAdapter;

impl RecordAdapter for PiAdapter {
    fn runtime(&self) -> RuntimeKind {
        RuntimeKind::Pi
    }

    fn process_record(&self, agent_id: AgentId, record: &Value) -> Vec<RuntimeEvent> {
        let record = match PiRecord::deserialize(record) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Dropping malformed Pi record for agent {}: {}", agent_id, e);
                return Vec::new();
            }
        };

        let (timestamp, payload) = match record {
            PiRecord::AgentStart {
                session_id,
                timestamp,
            } => (timestamp, EventPayload::AgentStart { session_id }),
            PiRecord::AgentEnd { reason, timestamp } => (timestamp, EventPayload::AgentEnd { reason }),
            PiRecord::ToolExecutionStart {
                tool_call_id,
                tool_name,
                args,
                parent_tool_id,
                timestamp,
            } => (
                timestamp,
                EventPayload::ToolStart {
                    tool_call_id,
                    tool_name: normalize_tool_name(tool_name.as_deref().unwrap_or("unknown")),
                    args_preview: args_preview(args.as_ref()),
                    parent_tool_id,
                },
            ),
            PiRecord::ToolExecutionEnd {
                tool_call_id,
                error,
                parent_tool_id,
                timestamp,
            } => {
                let status = if error_is_set(error.as_ref()) {
                    ToolStatus::Error
                } else {
                    ToolStatus::Ok
                };
                let error = match error {
                    Some(Value::String(s)) if !s.is_empty() => Some(s),
                    _ => None,
                };
                (
                    timestamp,
                    EventPayload::ToolEnd {
                        tool_call_id,
                        status: Some(status),
                        error,
                        parent_tool_id,
                    },
                )
            }
            PiRecord::TurnEnd { timestamp } => (
                timestamp,
                EventPayload::AgentEnd {
                    reason: Some("turn_complete".to_string()),
                },
            ),
            PiRecord::MessageStreamingStart { timestamp } => (
                timestamp,
                EventPayload::ToolStart {
                    tool_call_id: streaming_call_id(agent_id),
                    tool_name: TYPING_TOOL.to_string(),
                    args_preview: Some("Generating response...".to_string()),
                    parent_tool_id: None,
                },
            ),
            PiRecord::MessageStreamingEnd { timestamp } => (
                timestamp,
                EventPayload::ToolEnd {
                    tool_call_id: streaming_call_id(agent_id),
                    status: Some(ToolStatus::Ok),
                    error: None,
                    parent_tool_id: None,
                },
            ),
            PiRecord::TurnStart {}
            | PiRecord::ToolExecutionUpdate {}
            | PiRecord::MessageStreamingUpdate {}
            | PiRecord::Other => return Vec::new(),
        };

        vec![RuntimeEvent::new(
            RuntimeKind::Pi,
            agent_id,
            resolve_timestamp(timestamp.as_ref()),
            payload,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_tool_names_case_insensitively() {
        assert_eq!(normalize_tool_name("bash"), "Bash");
        assert_eq!(normalize_tool_name("READ"), "Read");
        assert_eq!(normalize_tool_name("ls"), "Ls");
    }

    #[test]
    fn unknown_tool_names_pass_through() {
        assert_eq!(normalize_tool_name("web_search"), "web_search");
        assert_eq!(normalize_tool_name("Task"), "Task");
    }

    #[test]
    fn streaming_pair_shares_one_call_id() {
        assert_eq!(streaming_call_id(4), "streaming-4");
    }
}
