// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Google generative-API dialect.
//!
//! Conversation turns are `{role, parts}` objects with role `user` / `model`.
//! There is no native tool-result message form; results re-enter as user
//! messages, which loses the tool-call linkage.  That matches the upstream
//! behaviour and is not compensated for here.
//!
//! Builders return a one-element array rather than a bare object; the history
//! assembler flattens these when building the outer `contents` array.

use serde_json::{json, Value};

use crate::sse::SseEvent;
use crate::types::{StopReason, StreamEvent, Usage};

pub fn user_message(text: &str) -> Value {
    json!([{ "role": "user", "parts": [{ "text": text }] }])
}

pub fn assistant_message(text: &str) -> Value {
    json!([{ "role": "model", "parts": [{ "text": text }] }])
}

/// User-message fallback; `tool_call_id` is unused on this wire.
pub fn tool_result_message(_tool_call_id: &str, content: &str) -> Value {
    user_message(content)
}

pub(crate) fn parse_stream_event(ev: &SseEvent) -> Option<StreamEvent> {
    let v: Value = serde_json::from_str(&ev.data).ok()?;

    if let Some(meta) = v.get("usageMetadata") {
        return Some(StreamEvent::Usage(Usage {
            input_tokens: meta["promptTokenCount"].as_u64().unwrap_or(0),
            output_tokens: meta["candidatesTokenCount"].as_u64().unwrap_or(0),
        }));
    }

    let candidate = &v["candidates"][0];
    if let Some(parts) = candidate["content"]["parts"].as_array() {
        for part in parts {
            // A function call arrives whole in a single part; carry its
            // arguments as the opening input delta.
            if let Some(fc) = part.get("functionCall") {
                let name = fc["name"].as_str().unwrap_or("").to_string();
                let args = serde_json::to_string(&fc["args"]).unwrap_or_default();
                return Some(StreamEvent::ToolCallStart {
                    // The wire has no call id; the function name stands in.
                    id: name.clone(),
                    name,
                    input_delta: Some(args),
                });
            }
            if let Some(text) = part["text"].as_str() {
                return Some(StreamEvent::TextDelta(text.to_string()));
            }
        }
    }

    if let Some(fr) = candidate["finishReason"].as_str() {
        return Some(StreamEvent::Stop {
            reason: map_finish_reason(fr),
            usage: None,
        });
    }

    None
}

pub(crate) fn map_finish_reason(s: &str) -> Option<StopReason> {
    match s {
        "STOP" => Some(StopReason::EndTurn),
        "MAX_TOKENS" => Some(StopReason::MaxTokens),
        "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" => Some(StopReason::ContentFilter),
        _ => None,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
