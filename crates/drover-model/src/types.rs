// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

// ─── Wire dialect tags ────────────────────────────────────────────────────────

/// Which provider wire shape a request/response pair speaks.
///
/// OpenAI-compatible gateways reuse [`ApiType::OpenAiCompletions`]; only the
/// endpoint URL differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiType {
    AnthropicMessages,
    OpenAiCompletions,
    GoogleGenerative,
}

// ─── Conversation history ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    User,
    Assistant,
    ToolResult,
}

/// A single entry in the runtime-owned conversation log.
///
/// Tool results carry the id and name of the call they answer so the dialect
/// builders can reference them in their wire encodings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: HistoryRole,
    pub content: String,
    pub tool_call_id: Option<String>,
    pub tool_name: Option<String>,
}

impl HistoryMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            content: text.into(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Assistant,
            content: text.into(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: HistoryRole::ToolResult,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
        }
    }
}

// ─── Normalized run result ────────────────────────────────────────────────────

/// Token usage for one inference call, accumulated across stream events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Why the provider stopped generating, normalized across dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    ContentFilter,
}

/// A tool invocation requested by the model.  `input_json` is the raw
/// argument object exactly as streamed, unparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input_json: String,
}

/// The normalized outcome of one inference call.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// Concatenated text deltas; `None` when the model produced no text.
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: Option<StopReason>,
    pub usage: Usage,
}

impl RunResult {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ─── Normalized stream events ─────────────────────────────────────────────────

/// One logical event produced by a dialect parser from a raw SSE frame.
///
/// Dialects that announce a tool call and its first argument bytes in the same
/// frame carry them together in `ToolCallStart::input_delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Start {
        usage: Option<Usage>,
    },
    TextDelta(String),
    ToolCallStart {
        id: String,
        name: String,
        input_delta: Option<String>,
    },
    ToolCallDelta(String),
    ToolCallEnd,
    Stop {
        reason: Option<StopReason>,
        usage: Option<Usage>,
    },
    Usage(Usage),
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_user_constructor() {
        let m = HistoryMessage::user("hello");
        assert_eq!(m.role, HistoryRole::User);
        assert_eq!(m.content, "hello");
        assert!(m.tool_call_id.is_none());
    }

    #[test]
    fn history_tool_result_carries_linkage() {
        let m = HistoryMessage::tool_result("call_1", "bash", "ok");
        assert_eq!(m.role, HistoryRole::ToolResult);
        assert_eq!(m.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(m.tool_name.as_deref(), Some("bash"));
    }

    #[test]
    fn usage_add_accumulates_both_sides() {
        let mut u = Usage {
            input_tokens: 10,
            output_tokens: 5,
        };
        u.add(&Usage {
            input_tokens: 3,
            output_tokens: 7,
        });
        assert_eq!(u.input_tokens, 13);
        assert_eq!(u.output_tokens, 12);
    }

    #[test]
    fn empty_run_result_has_no_tool_calls() {
        let r = RunResult::default();
        assert!(!r.has_tool_calls());
        assert!(r.text.is_none());
        assert!(r.stop_reason.is_none());
    }

    #[test]
    fn run_result_with_calls_reports_them() {
        let r = RunResult {
            tool_calls: vec![ToolCall {
                id: "c".into(),
                name: "bash".into(),
                input_json: "{}".into(),
            }],
            ..RunResult::default()
        };
        assert!(r.has_tool_calls());
    }
}
