// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The driver: alternate inference and tool dispatch until the model answers
//! in text alone or the run reaches a terminal state.

use tracing::warn;

use drover_model::{ProviderDispatch, RunResult};

use crate::error::RuntimeError;
use crate::runtime::AgentRuntime;
use crate::tools::{ToolRegistry, ToolResultInput};

/// Drive `runtime` against `dispatch` until completion.
///
/// Each turn runs one inference.  When the model requests tools and a
/// registry is present, every call is dispatched in order and the results
/// submitted before the next turn; otherwise the run completes with that
/// result.  When `next_turn` refuses (turn budget spent, or a terminal state
/// reached), the last result — possibly empty — is returned; the run's
/// outcome is carried by the runtime state and its events.
pub async fn run(
    runtime: &mut AgentRuntime,
    dispatch: &ProviderDispatch,
    registry: Option<&dyn ToolRegistry>,
) -> Result<RunResult, RuntimeError> {
    runtime.start()?;
    let mut last = RunResult::default();

    while runtime.next_turn() {
        let result = runtime.run_inference(dispatch).await?;

        if result.has_tool_calls() && registry.is_some() {
            let registry = registry.unwrap();
            let mut results = Vec::with_capacity(result.tool_calls.len());
            for call in &result.tool_calls {
                let content = match registry.execute(&call.name, &call.input_json).await {
                    Some(output) => output.output,
                    None => {
                        warn!(tool = %call.name, "tool not found in registry");
                        "tool not found".to_string()
                    }
                };
                results.push(ToolResultInput {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    content,
                });
            }
            runtime.submit_tool_results(results)?;
            last = result;
            continue;
        }

        runtime.complete(result.text.as_deref())?;
        return Ok(result);
    }

    Ok(last)
}
