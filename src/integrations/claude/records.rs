//! Claude transcript record shapes
//!
//! Only the fields the adapter reads are modelled. Records look like:
//!
//! ```json
//! {"type":"assistant","timestamp":"2024-01-01T00:00:00Z",
//!  "message":{"content":[{"type":"tool_use","id":"toolu_1","name":"Read","input":{}}]}}
//! {"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"toolu_1"}]}}
//! {"type":"system","subtype":"turn_duration"}
//! {"type":"progress","parentToolUseID":"toolu_1",
//!  "data":{"message":{"type":"assistant","message":{"content":[...]}}}}
//! ```

use crate::integrations::{lenient_string, non_empty_string};
use serde::Deserialize;
use serde_json::Value;

/// Top-level transcript record, discriminated by `type`
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeRecord {
    Assistant {
        message: TranscriptMessage,
        #[serde(default)]
        timestamp: Option<Value>,
    },
    User {
        message: TranscriptMessage,
        #[serde(default)]
        timestamp: Option<Value>,
    },
    System {
        #[serde(default, deserialize_with = "lenient_string")]
        subtype: Option<String>,
        #[serde(default)]
        timestamp: Option<Value>,
    },
    Progress {
        #[serde(rename = "parentToolUseID", deserialize_with = "non_empty_string")]
        parent_tool_use_id: String,
        data: ProgressData,
        #[serde(default)]
        timestamp: Option<Value>,
    },
    #[serde(other)]
    Other,
}

/// A message whose content is a list of blocks.
///
/// Blocks stay untyped here so one malformed block cannot reject its siblings.
#[derive(Debug, Deserialize)]
pub struct TranscriptMessage {
    pub content: Vec<Value>,
}

/// Sub-agent activity frame carried by a `progress` record
#[derive(Debug, Deserialize)]
pub struct ProgressData {
    pub message: ProgressMessage,
}

#[derive(Debug, Deserialize)]
pub struct ProgressMessage {
    /// Inner role: "assistant" or "user"
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    pub message: TranscriptMessage,
}

/// One content block of a transcript message
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    ToolUse {
        id: String,
        #[serde(default, deserialize_with = "lenient_string")]
        name: Option<String>,
        #[serde(default)]
        input: Option<Value>,
    },
    ToolResult {
        tool_use_id: String,
    },
    #[serde(other)]
    Other,
}

impl ContentBlock {
    /// Decode a raw block, treating anything malformed as [`ContentBlock::Other`]
    pub fn decode(raw: &Value) -> Self {
        ContentBlock::deserialize(raw).unwrap_or(ContentBlock::Other)
    }
}
