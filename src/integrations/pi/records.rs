//! Pi telemetry record shapes
//!
//! The Pi telemetry extension appends one flat record per line:
//!
//! ```json
//! {"type":"tool_execution_start","sessionId":"abc","timestamp":1001,
//!  "toolCallId":"t1","toolName":"bash","args":{"command":"ls"}}
//! ```

use crate::integrations::{lenient_string, non_empty_string};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PiRecord {
    AgentStart {
        #[serde(rename = "sessionId", default, deserialize_with = "lenient_string")]
        session_id: Option<String>,
        #[serde(default)]
        timestamp: Option<Value>,
    },
    AgentEnd {
        #[serde(default, deserialize_with = "lenient_string")]
        reason: Option<String>,
        #[serde(default)]
        timestamp: Option<Value>,
    },
    ToolExecutionStart {
        #[serde(rename = "toolCallId", deserialize_with = "non_empty_string")]
        tool_call_id: String,
        #[serde(rename = "toolName", default, deserialize_with = "lenient_string")]
        tool_name: Option<String>,
        #[serde(default)]
        args: Option<Value>,
        #[serde(rename = "parentToolId", default, deserialize_with = "lenient_string")]
        parent_tool_id: Option<String>,
        #[serde(default)]
        timestamp: Option<Value>,
    },
    ToolExecutionUpdate {},
    ToolExecutionEnd {
        #[serde(rename = "toolCallId", deserialize_with = "non_empty_string")]
        tool_call_id: String,
        #[serde(default)]
        error: Option<Value>,
        #[serde(rename = "parentToolId", default, deserialize_with = "lenient_string")]
        parent_tool_id: Option<String>,
        #[serde(default)]
        timestamp: Option<Value>,
    },
    TurnStart {},
    TurnEnd {
        #[serde(default)]
        timestamp: Option<Value>,
    },
    MessageStreamingStart {
        #[serde(default)]
        timestamp: Option<Value>,
    },
    MessageStreamingUpdate {},
    MessageStreamingEnd {
        #[serde(default)]
        timestamp: Option<Value>,
    },
    #[serde(other)]
    Other,
}

/// Whether an `error` field signals failure: present and not null, false, 0 or ""
pub fn error_is_set(error: Option<&Value>) -> bool {
    match error {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}
