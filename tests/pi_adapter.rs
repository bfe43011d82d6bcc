//! Tests for the Pi telemetry adapter

use serde_json::json;
use telemux::data::{EventPayload, RuntimeKind, ToolStatus};
use telemux::integrations::pi::{normalize_tool_name, PiAdapter, TYPING_TOOL};
use telemux::integrations::RecordAdapter;

mod tool_names {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_names_are_capitalized() {
        assert_eq!(normalize_tool_name("bash"), "Bash");
        assert_eq!(normalize_tool_name("READ"), "Read");
        assert_eq!(normalize_tool_name("ls"), "Ls");
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(normalize_tool_name("web_search"), "web_search");
    }
}

mod tool_execution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn start_is_normalized_and_previewed() {
        let events = PiAdapter.process_record(
            1,
            &json!({
                "type": "tool_execution_start",
                "sessionId": "abc",
                "timestamp": 1001,
                "toolCallId": "t1",
                "toolName": "bash",
                "args": {"command": "ls"}
            }),
        );

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].runtime, RuntimeKind::Pi);
        assert_eq!(events[0].ts, 1001);
        assert_eq!(
            events[0].payload,
            EventPayload::ToolStart {
                tool_call_id: "t1".to_string(),
                tool_name: "Bash".to_string(),
                args_preview: Some(r#"{"command":"ls"}"#.to_string()),
                parent_tool_id: None,
            }
        );
    }

    #[test]
    fn missing_tool_call_id_drops_record() {
        let events = PiAdapter.process_record(
            1,
            &json!({"type": "tool_execution_start", "toolName": "bash"}),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn empty_tool_call_id_drops_record() {
        let start = PiAdapter.process_record(
            1,
            &json!({"type": "tool_execution_start", "toolCallId": "", "toolName": "bash"}),
        );
        assert!(start.is_empty());

        let end = PiAdapter.process_record(
            1,
            &json!({"type": "tool_execution_end", "toolCallId": ""}),
        );
        assert!(end.is_empty());
    }

    #[test]
    fn end_with_error_reports_error_status() {
        let events = PiAdapter.process_record(
            1,
            &json!({
                "type": "tool_execution_end",
                "toolCallId": "t1",
                "error": "exit code 1"
            }),
        );
        assert_eq!(
            events[0].payload,
            EventPayload::ToolEnd {
                tool_call_id: "t1".to_string(),
                status: Some(ToolStatus::Error),
                error: Some("exit code 1".to_string()),
                parent_tool_id: None,
            }
        );
    }

    #[test]
    fn end_without_error_is_ok() {
        let events = PiAdapter.process_record(
            1,
            &json!({"type": "tool_execution_end", "toolCallId": "t1", "error": null}),
        );
        assert!(matches!(
            &events[0].payload,
            EventPayload::ToolEnd { status: Some(ToolStatus::Ok), error: None, .. }
        ));
    }

    #[test]
    fn updates_are_ignored() {
        let events = PiAdapter.process_record(
            1,
            &json!({"type": "tool_execution_update", "toolCallId": "t1"}),
        );
        assert!(events.is_empty());
    }
}

mod turns_and_streaming {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn turn_end_ends_the_agent_turn() {
        let events = PiAdapter.process_record(2, &json!({"type": "turn_end", "timestamp": 9}));
        assert_eq!(
            events[0].payload,
            EventPayload::AgentEnd {
                reason: Some("turn_complete".to_string())
            }
        );
        assert!(PiAdapter
            .process_record(2, &json!({"type": "turn_start"}))
            .is_empty());
    }

    #[test]
    fn streaming_start_and_end_share_the_typing_tool_id() {
        let start = PiAdapter.process_record(5, &json!({"type": "message_streaming_start"}));
        let end = PiAdapter.process_record(5, &json!({"type": "message_streaming_end"}));

        assert!(matches!(
            &start[0].payload,
            EventPayload::ToolStart { tool_name, .. } if tool_name == TYPING_TOOL
        ));
        assert_eq!(start[0].payload.tool_call_id(), Some("streaming-5"));
        assert_eq!(end[0].payload.tool_call_id(), Some("streaming-5"));
        assert_eq!(end[0].event_type(), "tool_end");
    }

    #[test]
    fn agent_lifecycle_passes_through() {
        let start = PiAdapter.process_record(
            3,
            &json!({"type": "agent_start", "sessionId": "abc", "timestamp": 1}),
        );
        assert_eq!(
            start[0].payload,
            EventPayload::AgentStart {
                session_id: Some("abc".to_string())
            }
        );

        let end = PiAdapter.process_record(3, &json!({"type": "agent_end", "reason": "done"}));
        assert_eq!(
            end[0].payload,
            EventPayload::AgentEnd {
                reason: Some("done".to_string())
            }
        );
    }

    #[test]
    fn unknown_type_produces_nothing() {
        assert!(PiAdapter
            .process_record(1, &json!({"type": "model_change"}))
            .is_empty());
    }

    #[test]
    fn missing_timestamp_uses_wall_clock() {
        let before = chrono::Utc::now().timestamp_millis();
        let events = PiAdapter.process_record(1, &json!({"type": "turn_end"}));
        assert!(events[0].ts >= before);
    }
}
