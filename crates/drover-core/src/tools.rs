// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;

/// What a tool produced.  `success` is advisory; the content is forwarded to
/// the model either way.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn err(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Contract consumed by the run loop.
///
/// `execute` returns `None` for a tool the registry does not know; the loop
/// surfaces that to the model as a `"tool not found"` result rather than
/// failing the run.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    async fn execute(&self, name: &str, input_json: &str) -> Option<ToolOutput>;
}

/// One tool result ready for re-injection into the conversation.
#[derive(Debug, Clone)]
pub struct ToolResultInput {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: String,
}
