// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Anthropic Messages dialect: request-body message builders and the
//! stream-event parser for `message_start` / `content_block_*` /
//! `message_delta` / `message_stop` frames.

use serde_json::{json, Value};

use crate::sse::SseEvent;
use crate::types::{StopReason, StreamEvent, Usage};

pub fn user_message(text: &str) -> Value {
    json!({ "role": "user", "content": text })
}

pub fn assistant_message(text: &str) -> Value {
    json!({ "role": "assistant", "content": text })
}

/// Tool results are user-role messages holding a `tool_result` content block
/// that references the originating `tool_use` id.
pub fn tool_result_message(tool_call_id: &str, content: &str) -> Value {
    json!({
        "role": "user",
        "content": [{
            "type": "tool_result",
            "tool_use_id": tool_call_id,
            "content": content,
        }]
    })
}

pub(crate) fn parse_stream_event(ev: &SseEvent) -> Option<StreamEvent> {
    let v: Value = serde_json::from_str(&ev.data).ok()?;
    match v["type"].as_str().unwrap_or("") {
        "message_start" => {
            let usage = v["message"].get("usage").map(parse_usage);
            Some(StreamEvent::Start { usage })
        }
        "content_block_start" => {
            let block = &v["content_block"];
            if block["type"].as_str() == Some("tool_use") {
                Some(StreamEvent::ToolCallStart {
                    id: block["id"].as_str().unwrap_or("").to_string(),
                    name: block["name"].as_str().unwrap_or("").to_string(),
                    input_delta: None,
                })
            } else {
                None
            }
        }
        "content_block_delta" => {
            let delta = &v["delta"];
            match delta["type"].as_str().unwrap_or("") {
                "text_delta" => Some(StreamEvent::TextDelta(
                    delta["text"].as_str().unwrap_or("").to_string(),
                )),
                "input_json_delta" => Some(StreamEvent::ToolCallDelta(
                    delta["partial_json"].as_str().unwrap_or("").to_string(),
                )),
                _ => None,
            }
        }
        "content_block_stop" => Some(StreamEvent::ToolCallEnd),
        "message_delta" => {
            let reason = v["delta"]["stop_reason"].as_str().and_then(map_stop_reason);
            let usage = v.get("usage").map(parse_usage);
            Some(StreamEvent::Stop { reason, usage })
        }
        "message_stop" => Some(StreamEvent::Stop {
            reason: None,
            usage: None,
        }),
        // ping and future event types are ignored.
        _ => None,
    }
}

fn parse_usage(u: &Value) -> Usage {
    Usage {
        input_tokens: u["input_tokens"].as_u64().unwrap_or(0),
        output_tokens: u["output_tokens"].as_u64().unwrap_or(0),
    }
}

pub(crate) fn map_stop_reason(s: &str) -> Option<StopReason> {
    match s {
        "end_turn" => Some(StopReason::EndTurn),
        "tool_use" => Some(StopReason::ToolUse),
        "max_tokens" => Some(StopReason::MaxTokens),
        "stop_sequence" => Some(StopReason::StopSequence),
        "refusal" => Some(StopReason::ContentFilter),
        _ => None,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(name: &str, data: &str) -> SseEvent {
        SseEvent {
            event_name: Some(name.into()),
            data: data.into(),
        }
    }

    // ── parse_stream_event ────────────────────────────────────────────────────

    #[test]
    fn message_start_yields_input_usage() {
        let e = ev(
            "message_start",
            r#"{"type":"message_start","message":{"usage":{"input_tokens":42}}}"#,
        );
        let parsed = parse_stream_event(&e).unwrap();
        assert_eq!(
            parsed,
            StreamEvent::Start {
                usage: Some(Usage {
                    input_tokens: 42,
                    output_tokens: 0
                })
            }
        );
    }

    #[test]
    fn content_block_start_tool_use_opens_call() {
        let e = ev(
            "content_block_start",
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"toolu_01","name":"bash"}}"#,
        );
        let parsed = parse_stream_event(&e).unwrap();
        assert_eq!(
            parsed,
            StreamEvent::ToolCallStart {
                id: "toolu_01".into(),
                name: "bash".into(),
                input_delta: None
            }
        );
    }

    #[test]
    fn content_block_start_text_is_ignored() {
        let e = ev(
            "content_block_start",
            r#"{"type":"content_block_start","content_block":{"type":"text","text":""}}"#,
        );
        assert!(parse_stream_event(&e).is_none());
    }

    #[test]
    fn text_delta_parsed() {
        let e = ev(
            "content_block_delta",
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"world"}}"#,
        );
        assert_eq!(
            parse_stream_event(&e).unwrap(),
            StreamEvent::TextDelta("world".into())
        );
    }

    #[test]
    fn input_json_delta_parsed() {
        let e = ev(
            "content_block_delta",
            r#"{"type":"content_block_delta","delta":{"type":"input_json_delta","partial_json":"{\"cmd\":"}}"#,
        );
        assert_eq!(
            parse_stream_event(&e).unwrap(),
            StreamEvent::ToolCallDelta("{\"cmd\":".into())
        );
    }

    #[test]
    fn message_delta_carries_stop_reason_and_usage() {
        let e = ev(
            "message_delta",
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":5}}"#,
        );
        assert_eq!(
            parse_stream_event(&e).unwrap(),
            StreamEvent::Stop {
                reason: Some(StopReason::EndTurn),
                usage: Some(Usage {
                    input_tokens: 0,
                    output_tokens: 5
                }),
            }
        );
    }

    #[test]
    fn message_stop_is_unspecified_stop() {
        let e = ev("message_stop", r#"{"type":"message_stop"}"#);
        assert_eq!(
            parse_stream_event(&e).unwrap(),
            StreamEvent::Stop {
                reason: None,
                usage: None
            }
        );
    }

    #[test]
    fn ping_ignored() {
        let e = ev("ping", r#"{"type":"ping"}"#);
        assert!(parse_stream_event(&e).is_none());
    }

    #[test]
    fn malformed_json_ignored() {
        let e = ev("message_delta", "{not json");
        assert!(parse_stream_event(&e).is_none());
    }

    // ── Stop-reason mapping ───────────────────────────────────────────────────

    #[test]
    fn stop_reasons_map_to_normalized_enum() {
        assert_eq!(map_stop_reason("end_turn"), Some(StopReason::EndTurn));
        assert_eq!(map_stop_reason("tool_use"), Some(StopReason::ToolUse));
        assert_eq!(map_stop_reason("max_tokens"), Some(StopReason::MaxTokens));
        assert_eq!(
            map_stop_reason("stop_sequence"),
            Some(StopReason::StopSequence)
        );
        assert_eq!(map_stop_reason("refusal"), Some(StopReason::ContentFilter));
        assert_eq!(map_stop_reason("something_else"), None);
    }

    // ── Message builders ──────────────────────────────────────────────────────

    #[test]
    fn user_message_is_plain_role_content() {
        let v = user_message("hello");
        assert_eq!(v["role"], "user");
        assert_eq!(v["content"], "hello");
    }

    #[test]
    fn tool_result_wraps_content_block_with_tool_use_id() {
        let v = tool_result_message("toolu_01", "file contents");
        assert_eq!(v["role"], "user");
        let block = &v["content"][0];
        assert_eq!(block["type"], "tool_result");
        assert_eq!(block["tool_use_id"], "toolu_01");
        assert_eq!(block["content"], "file contents");
    }
}
