//! Claude transcript adapter
//!
//! Maps Claude's nested transcript records to canonical events:
//! 1. `assistant` tool_use blocks become ToolStart
//! 2. `user` tool_result blocks become ToolEnd
//! 3. `system` records with subtype `turn_duration` end the agent's turn
//! 4. `progress` frames describe sub-agent activity scoped to a parent tool call

pub mod records;

use super::{args_preview, resolve_timestamp, RecordAdapter};
use crate::data::{AgentId, EventPayload, RuntimeEvent, RuntimeKind, ToolStatus};
use records::{ClaudeRecord, ContentBlock, TranscriptMessage};
use serde::Deserialize;
use serde_json::Value;

/// Tool name used when a tool_use block has no usable name
const UNKNOWN_TOOL: &str = "unknown";

/// Stateless translator for Claude transcript records
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeAdapter;

impl RecordAdapter for ClaudeAdapter {
    fn runtime(&self) -> RuntimeKind {
        RuntimeKind::Claude
    }

    fn process_record(&self, agent_id: AgentId, record: &Value) -> Vec<RuntimeEvent> {
        let record = match ClaudeRecord::deserialize(record) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Dropping malformed Claude record for agent {}: {}", agent_id, e);
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        match record {
            ClaudeRecord::Assistant { message, timestamp } => {
                let ts = resolve_timestamp(timestamp.as_ref());
                for (id, name, input) in tool_uses(&message) {
                    out.push(event(
                        agent_id,
                        ts,
                        EventPayload::ToolStart {
                            tool_call_id: id,
                            tool_name: name,
                            args_preview: args_preview(input.as_ref()),
                            parent_tool_id: None,
                        },
                    ));
                }
            }
            ClaudeRecord::User { message, timestamp } => {
                let ts = resolve_timestamp(timestamp.as_ref());
                for tool_use_id in tool_results(&message) {
                    out.push(event(
                        agent_id,
                        ts,
                        EventPayload::ToolEnd {
                            tool_call_id: tool_use_id,
                            status: Some(ToolStatus::Ok),
                            error: None,
                            parent_tool_id: None,
                        },
                    ));
                }
            }
            ClaudeRecord::System { subtype, timestamp } => {
                if subtype.as_deref() == Some("turn_duration") {
                    out.push(event(
                        agent_id,
                        resolve_timestamp(timestamp.as_ref()),
                        EventPayload::AgentEnd {
                            reason: Some("turn_complete".to_string()),
                        },
                    ));
                }
            }
            ClaudeRecord::Progress {
                parent_tool_use_id,
                data,
                timestamp,
            } => {
                let ts = resolve_timestamp(timestamp.as_ref());
                let inner = data.message;
                progress_events(
                    agent_id,
                    ts,
                    &parent_tool_use_id,
                    inner.role.as_deref(),
                    &inner.message,
                    &mut out,
                );
            }
            ClaudeRecord::Other => {}
        }
        out
    }
}

/// Sub-agent activity: starts are emitted SubagentStart then ToolStart,
/// ends are emitted ToolEnd then SubagentEnd, per block.
fn progress_events(
    agent_id: AgentId,
    ts: i64,
    parent_tool_id: &str,
    role: Option<&str>,
    message: &TranscriptMessage,
    out: &mut Vec<RuntimeEvent>,
) {
    let subagent_id = format!("{}:{}", agent_id, parent_tool_id);

    match role {
        Some("assistant") => {
            for (id, name, _input) in tool_uses(message) {
                out.push(event(
                    agent_id,
                    ts,
                    EventPayload::SubagentStart {
                        subagent_id: subagent_id.clone(),
                        parent_tool_id: parent_tool_id.to_string(),
                        label: Some(name.clone()),
                    },
                ));
                out.push(event(
                    agent_id,
                    ts,
                    EventPayload::ToolStart {
                        tool_call_id: id,
                        tool_name: name,
                        args_preview: None,
                        parent_tool_id: Some(parent_tool_id.to_string()),
                    },
                ));
            }
        }
        Some("user") => {
            for tool_use_id in tool_results(message) {
                out.push(event(
                    agent_id,
                    ts,
                    EventPayload::ToolEnd {
                        tool_call_id: tool_use_id,
                        status: Some(ToolStatus::Ok),
                        error: None,
                        parent_tool_id: Some(parent_tool_id.to_string()),
                    },
                ));
                out.push(event(
                    agent_id,
                    ts,
                    EventPayload::SubagentEnd {
                        subagent_id: subagent_id.clone(),
                        parent_tool_id: parent_tool_id.to_string(),
                        reason: Some("tool_result".to_string()),
                    },
                ));
            }
        }
        _ => {}
    }
}

/// `(id, name, input)` for every well-formed tool_use block
fn tool_uses(message: &TranscriptMessage) -> impl Iterator<Item = (String, String, Option<Value>)> + '_ {
    message
        .content
        .iter()
        .filter_map(|raw| match ContentBlock::decode(raw) {
            ContentBlock::ToolUse { id, name, input } => {
                Some((id, name.unwrap_or_else(|| UNKNOWN_TOOL.to_string()), input))
            }
            _ => None,
        })
}

/// Referenced tool_use id for every well-formed tool_result block
fn tool_results(message: &TranscriptMessage) -> impl Iterator<Item = String> + '_ {
    message
        .content
        .iter()
        .filter_map(|raw| match ContentBlock::decode(raw) {
            ContentBlock::ToolResult { tool_use_id } => Some(tool_use_id),
            _ => None,
        })
}

fn event(agent_id: AgentId, ts: i64, payload: EventPayload) -> RuntimeEvent {
    RuntimeEvent::new(RuntimeKind::Claude, agent_id, ts, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn process(record: Value) -> Vec<RuntimeEvent> {
        ClaudeAdapter.process_record(7, &record)
    }

    #[test]
    fn malformed_blocks_do_not_hide_siblings() {
        let events = process(json!({
            "type": "assistant",
            "timestamp": 10,
            "message": {"content": [
                "not an object",
                {"type": "tool_use", "id": 42, "name": "Read"},
                {"type": "text", "text": "hi"},
                {"type": "tool_use", "id": "ok", "name": "Bash"}
            ]}
        }));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload.tool_call_id(), Some("ok"));
    }

    #[test]
    fn non_string_tool_name_defaults_to_unknown() {
        let events = process(json!({
            "type": "assistant",
            "message": {"content": [{"type": "tool_use", "id": "a", "name": 5}]}
        }));

        match &events[0].payload {
            EventPayload::ToolStart { tool_name, .. } => assert_eq!(tool_name, UNKNOWN_TOOL),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn string_content_is_rejected_without_events() {
        let events = process(json!({"type": "user", "message": {"content": "plain text"}}));
        assert!(events.is_empty());
    }

    #[test]
    fn progress_without_parent_is_dropped() {
        let events = process(json!({
            "type": "progress",
            "data": {"message": {"type": "assistant", "message": {"content": [
                {"type": "tool_use", "id": "x", "name": "Read"}
            ]}}}
        }));
        assert!(events.is_empty());
    }

    #[test]
    fn progress_with_unknown_role_emits_nothing() {
        let events = process(json!({
            "type": "progress",
            "parentToolUseID": "p",
            "data": {"message": {"type": "system", "message": {"content": [
                {"type": "tool_use", "id": "x", "name": "Read"}
            ]}}}
        }));
        assert!(events.is_empty());
    }
}
