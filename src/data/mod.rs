//! Canonical runtime event model
//!
//! Every adapter translates its runtime's raw records into [`RuntimeEvent`]s,
//! and the orchestrator consumes nothing else.
//!
//! # Wire shape
//!
//! ```json
//! {"schemaVersion":1,"runtime":"pi","agentId":1,"ts":1001,
//!  "eventType":"tool_start","toolCallId":"t1","toolName":"Bash"}
//! ```

use serde::{Deserialize, Serialize};

/// Current version of the canonical event schema
pub const SCHEMA_VERSION: u32 = 1;

/// Caller-assigned agent identifier
pub type AgentId = u32;

/// Which coding-agent runtime produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Claude,
    Pi,
}

impl RuntimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Pi => "pi",
        }
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Self::Claude),
            "pi" => Ok(Self::Pi),
            other => anyhow::bail!("Unknown runtime '{}' (expected 'claude' or 'pi')", other),
        }
    }
}

/// Outcome of a finished tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Ok,
    Error,
}

/// A single normalized event, owned by exactly one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEvent {
    pub schema_version: u32,
    pub runtime: RuntimeKind,
    pub agent_id: AgentId,
    /// Epoch milliseconds
    pub ts: i64,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl RuntimeEvent {
    /// Build an event stamped with the current schema version
    pub fn new(runtime: RuntimeKind, agent_id: AgentId, ts: i64, payload: EventPayload) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            runtime,
            agent_id,
            ts,
            payload,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

/// Variant-specific event data, tagged by `eventType`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "snake_case")]
pub enum EventPayload {
    #[serde(rename_all = "camelCase")]
    AgentStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    AgentEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ToolStart {
        tool_call_id: String,
        tool_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args_preview: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ToolEnd {
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<ToolStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_id: Option<String>,
    },
    TypingStart,
    TypingEnd,
    #[serde(rename_all = "camelCase")]
    PermissionWaitStart {
        tool_call_id: String,
        tool_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_subagent: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PermissionWaitEnd {
        tool_call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_subagent: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_tool_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubagentStart {
        subagent_id: String,
        parent_tool_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubagentEnd {
        subagent_id: String,
        parent_tool_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl EventPayload {
    /// Wire name of the `eventType` discriminator
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AgentStart { .. } => "agent_start",
            Self::AgentEnd { .. } => "agent_end",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::TypingStart => "typing_start",
            Self::TypingEnd => "typing_end",
            Self::PermissionWaitStart { .. } => "permission_wait_start",
            Self::PermissionWaitEnd { .. } => "permission_wait_end",
            Self::SubagentStart { .. } => "subagent_start",
            Self::SubagentEnd { .. } => "subagent_end",
        }
    }

    /// Tool call this event refers to, if any
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolStart { tool_call_id, .. }
            | Self::ToolEnd { tool_call_id, .. }
            | Self::PermissionWaitStart { tool_call_id, .. }
            | Self::PermissionWaitEnd { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    pub fn parent_tool_id(&self) -> Option<&str> {
        match self {
            Self::ToolStart { parent_tool_id, .. }
            | Self::ToolEnd { parent_tool_id, .. }
            | Self::PermissionWaitStart { parent_tool_id, .. }
            | Self::PermissionWaitEnd { parent_tool_id, .. } => parent_tool_id.as_deref(),
            Self::SubagentStart { parent_tool_id, .. }
            | Self::SubagentEnd { parent_tool_id, .. } => Some(parent_tool_id),
            _ => None,
        }
    }
}
