//! UI projections and the sinks that receive them
//!
//! The wire shape is what the status UI expects:
//!
//! ```json
//! {"type":"agentToolStart","id":1,"toolId":"t1","status":"Running Bash"}
//! ```

use crate::data::AgentId;
use crate::util::send_or_log;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::sync::mpsc;

/// One UI-facing notice derived from a canonical event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiMessage {
    AgentStatus {
        id: AgentId,
        status: String,
    },
    #[serde(rename_all = "camelCase")]
    AgentToolStart {
        id: AgentId,
        tool_id: String,
        status: String,
    },
    #[serde(rename_all = "camelCase")]
    AgentToolDone { id: AgentId, tool_id: String },
    #[serde(rename_all = "camelCase")]
    AgentToolPermission {
        id: AgentId,
        tool_id: String,
        status: String,
    },
    AgentToolPermissionClear { id: AgentId },
    #[serde(rename_all = "camelCase")]
    SubagentToolStart {
        id: AgentId,
        parent_tool_id: String,
        status: String,
    },
    #[serde(rename_all = "camelCase")]
    SubagentToolDone { id: AgentId, parent_tool_id: String },
}

impl UiMessage {
    pub fn agent_id(&self) -> AgentId {
        match self {
            Self::AgentStatus { id, .. }
            | Self::AgentToolStart { id, .. }
            | Self::AgentToolDone { id, .. }
            | Self::AgentToolPermission { id, .. }
            | Self::AgentToolPermissionClear { id }
            | Self::SubagentToolStart { id, .. }
            | Self::SubagentToolDone { id, .. } => *id,
        }
    }
}

/// Destination for UI projections. Posting never blocks and never fails.
pub trait UiSink: Send {
    fn post(&self, message: UiMessage);
}

/// Forwards projections into a tokio channel
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<UiMessage>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving half
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl UiSink for ChannelSink {
    fn post(&self, message: UiMessage) {
        send_or_log(&self.tx, message, "UI projection");
    }
}

/// Writes projections to stdout as JSON lines
#[derive(Debug, Default)]
pub struct StdoutSink;

impl UiSink for StdoutSink {
    fn post(&self, message: UiMessage) {
        let line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to serialize UI projection: {}", e);
                return;
            }
        };
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line) {
            tracing::warn!("Failed to write UI projection: {}", e);
        }
    }
}
