// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Serialize runtime-owned history into a dialect's wire-shaped message array.

use serde_json::Value;

use crate::types::{ApiType, HistoryMessage, HistoryRole};
use crate::{anthropic, google, openai};

/// Build the `messages` (or `contents`) array for a request body.
///
/// Each entry is exactly what the dialect's message builder returns.  The
/// Google builders return one-element arrays, so their results are flattened
/// into the outer array instead of nested.
pub fn build_history(api: ApiType, messages: &[HistoryMessage]) -> String {
    let mut out: Vec<Value> = Vec::with_capacity(messages.len());
    for m in messages {
        let built = build_message(api, m);
        match built {
            Value::Array(items) => out.extend(items),
            other => out.push(other),
        }
    }
    Value::Array(out).to_string()
}

fn build_message(api: ApiType, m: &HistoryMessage) -> Value {
    let tool_call_id = m.tool_call_id.as_deref().unwrap_or("");
    match api {
        ApiType::AnthropicMessages => match m.role {
            HistoryRole::User => anthropic::user_message(&m.content),
            HistoryRole::Assistant => anthropic::assistant_message(&m.content),
            HistoryRole::ToolResult => anthropic::tool_result_message(tool_call_id, &m.content),
        },
        ApiType::OpenAiCompletions => match m.role {
            HistoryRole::User => openai::user_message(&m.content),
            HistoryRole::Assistant => openai::assistant_message(&m.content),
            HistoryRole::ToolResult => openai::tool_result_message(tool_call_id, &m.content),
        },
        ApiType::GoogleGenerative => match m.role {
            HistoryRole::User => google::user_message(&m.content),
            HistoryRole::Assistant => google::assistant_message(&m.content),
            HistoryRole::ToolResult => google::tool_result_message(tool_call_id, &m.content),
        },
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
