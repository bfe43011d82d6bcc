//! Runtime orchestrator
//!
//! Owns which runtime is authoritative, arbitrates swaps between runtimes,
//! keeps a bounded history of canonical events and projects each event to
//! an optional UI sink.
//!
//! # State machine
//!
//! ```text
//!            acquire_swap_lock()             release_swap_lock(next?)
//! Active* ─────────────────────▶ Swapping ──────────────────────────▶ next | mode default
//!                                    │
//!                                    └── mark_failed_rollback() ──▶ FailedRollback
//! ```

pub mod history;
pub mod sink;
pub mod state;

pub use history::{EventHistory, HISTORY_CAPACITY};
pub use sink::{ChannelSink, StdoutSink, UiMessage, UiSink};
pub use state::{RuntimeMode, RuntimeState};

use crate::data::{AgentId, EventPayload, RuntimeEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Default number of events returned by [`RuntimeOrchestrator::recent_events_default`]
pub const DEFAULT_RECENT_LIMIT: usize = 20;

/// Characters of the args preview shown in a tool status line
const STATUS_PREVIEW_LEN: usize = 40;

/// Consumer of canonical events
pub trait EventHandler {
    fn handle_event(&mut self, event: RuntimeEvent);
}

impl<H: EventHandler> EventHandler for Arc<Mutex<H>> {
    fn handle_event(&mut self, event: RuntimeEvent) {
        match self.lock() {
            Ok(mut guard) => guard.handle_event(event),
            Err(e) => tracing::warn!("Event handler lock poisoned: {e}"),
        }
    }
}

/// Tool currently running for some agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTool {
    pub tool_name: String,
    pub agent_id: AgentId,
    /// Start order, used to sweep in the order tools began
    seq: u64,
}

pub struct RuntimeOrchestrator {
    mode: RuntimeMode,
    state: RuntimeState,
    swap_locked: bool,
    history: EventHistory,
    active_tools: HashMap<String, ActiveTool>,
    next_seq: u64,
    sink: Option<Box<dyn UiSink>>,
}

impl RuntimeOrchestrator {
    pub fn new(mode: RuntimeMode) -> Self {
        Self {
            mode,
            state: mode.default_state(),
            swap_locked: false,
            history: EventHistory::default(),
            active_tools: HashMap::new(),
            next_seq: 0,
            sink: None,
        }
    }

    /// Orchestrator that forwards projections to `sink`
    pub fn with_sink(mode: RuntimeMode, sink: Box<dyn UiSink>) -> Self {
        let mut orchestrator = Self::new(mode);
        orchestrator.set_sink(Some(sink));
        orchestrator
    }

    /// Attach or detach the UI sink. Without one, only history is kept.
    pub fn set_sink(&mut self, sink: Option<Box<dyn UiSink>>) {
        self.sink = sink;
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn is_swap_locked(&self) -> bool {
        self.swap_locked
    }

    /// Begin a swap. Returns false, leaving state untouched, if one is already in flight.
    pub fn acquire_swap_lock(&mut self) -> bool {
        if self.swap_locked {
            tracing::debug!("Swap lock already held (state {:?})", self.state);
            return false;
        }
        self.swap_locked = true;
        self.state = RuntimeState::Swapping;
        tracing::info!("Swap lock acquired");
        true
    }

    /// Finish a swap, settling in `next_state` or the mode's default active state
    pub fn release_swap_lock(&mut self, next_state: Option<RuntimeState>) {
        self.swap_locked = false;
        self.state = next_state.unwrap_or_else(|| self.mode.default_state());
        tracing::info!("Swap lock released, state {:?}", self.state);
    }

    /// Abandon the current swap attempt. A later acquire may still succeed.
    pub fn mark_failed_rollback(&mut self) {
        self.swap_locked = false;
        self.state = RuntimeState::FailedRollback;
        tracing::warn!("Runtime swap rollback failed");
    }

    /// Up to `limit` most recent events in arrival order
    pub fn recent_events(&self, limit: usize) -> Vec<RuntimeEvent> {
        if limit == 0 {
            return Vec::new();
        }
        self.history.recent(limit)
    }

    pub fn recent_events_default(&self) -> Vec<RuntimeEvent> {
        self.recent_events(DEFAULT_RECENT_LIMIT)
    }

    /// Tools currently running, keyed by tool call id
    pub fn active_tools(&self) -> &HashMap<String, ActiveTool> {
        &self.active_tools
    }

    fn post(&self, message: UiMessage) {
        if let Some(sink) = &self.sink {
            sink.post(message);
        }
    }

    /// Apply an event to the tool registry and derive its UI notices
    fn project(&mut self, event: &RuntimeEvent) -> Vec<UiMessage> {
        let id = event.agent_id;
        match &event.payload {
            EventPayload::TypingStart => vec![UiMessage::AgentStatus {
                id,
                status: "Working...".to_string(),
            }],
            EventPayload::TypingEnd => vec![UiMessage::AgentStatus {
                id,
                status: "active".to_string(),
            }],
            EventPayload::ToolStart {
                tool_call_id,
                tool_name,
                args_preview,
                ..
            } => {
                self.next_seq += 1;
                self.active_tools.insert(
                    tool_call_id.clone(),
                    ActiveTool {
                        tool_name: tool_name.clone(),
                        agent_id: id,
                        seq: self.next_seq,
                    },
                );
                vec![UiMessage::AgentToolStart {
                    id,
                    tool_id: tool_call_id.clone(),
                    status: tool_status_line(tool_name, args_preview.as_deref()),
                }]
            }
            EventPayload::ToolEnd { tool_call_id, .. } => {
                self.active_tools.remove(tool_call_id);
                vec![UiMessage::AgentToolDone {
                    id,
                    tool_id: tool_call_id.clone(),
                }]
            }
            EventPayload::AgentEnd { .. } => {
                let mut swept: Vec<(String, u64)> = self
                    .active_tools
                    .iter()
                    .filter(|(_, tool)| tool.agent_id == id)
                    .map(|(tool_id, tool)| (tool_id.clone(), tool.seq))
                    .collect();
                swept.sort_by_key(|(_, seq)| *seq);

                let mut messages = Vec::with_capacity(swept.len() + 1);
                for (tool_id, _) in swept {
                    self.active_tools.remove(&tool_id);
                    messages.push(UiMessage::AgentToolDone { id, tool_id });
                }
                messages.push(UiMessage::AgentStatus {
                    id,
                    status: "waiting".to_string(),
                });
                messages
            }
            EventPayload::PermissionWaitStart {
                tool_call_id,
                tool_name,
                ..
            } => vec![UiMessage::AgentToolPermission {
                id,
                tool_id: tool_call_id.clone(),
                status: tool_name.clone(),
            }],
            EventPayload::PermissionWaitEnd { .. } => {
                vec![UiMessage::AgentToolPermissionClear { id }]
            }
            EventPayload::SubagentStart {
                parent_tool_id,
                label,
                ..
            } => vec![UiMessage::SubagentToolStart {
                id,
                parent_tool_id: parent_tool_id.clone(),
                status: label.clone().unwrap_or_else(|| "Subtask".to_string()),
            }],
            EventPayload::SubagentEnd { parent_tool_id, .. } => vec![UiMessage::SubagentToolDone {
                id,
                parent_tool_id: parent_tool_id.clone(),
            }],
            EventPayload::AgentStart { .. } => Vec::new(),
        }
    }
}

impl EventHandler for RuntimeOrchestrator {
    fn handle_event(&mut self, event: RuntimeEvent) {
        let messages = self.project(&event);
        self.history.push(event);
        for message in messages {
            self.post(message);
        }
    }
}

impl std::fmt::Debug for RuntimeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeOrchestrator")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("swap_locked", &self.swap_locked)
            .field("history_len", &self.history.len())
            .field("active_tools", &self.active_tools.len())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

fn tool_status_line(tool_name: &str, args_preview: Option<&str>) -> String {
    match args_preview {
        Some(preview) => format!(
            "Running {} {}",
            tool_name,
            crate::integrations::truncate_chars(preview, STATUS_PREVIEW_LEN)
        ),
        None => format!("Running {}", tool_name),
    }
}
