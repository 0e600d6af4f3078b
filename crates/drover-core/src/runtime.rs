// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The run state machine: history ownership, turn accounting, provider
//! dispatch, and event emission for one driven conversation.

use tracing::{debug, warn};
use uuid::Uuid;

use drover_config::AgentConfig;
use drover_model::{
    build_history, HistoryMessage, ProviderDispatch, RunResult, Usage, WireError,
};

use crate::error::RuntimeError;
use crate::events::{EventSink, RunEvent, RunEventKind};
use crate::failover::{build_failover_key, FailoverReason, FailoverState};
use crate::tools::ToolResultInput;

/// Lifecycle of a run.  `Completed`, `Failed`, and `Aborted` are terminal;
/// nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    WaitingTool,
    /// Reserved for a summarization transition driven from outside.
    Compacting,
    Completed,
    Failed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }
}

/// Immutable per-run settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Stamped onto every event this run emits.
    pub agent_id: String,
    /// `next_turn` fails the run once the counter reaches this.
    pub max_turns: u32,
    /// Pre-serialized tool schema array in the dispatch dialect's shape,
    /// forwarded verbatim with every inference call.
    pub tools_json: Option<String>,
}

impl RunConfig {
    pub fn new(agent_id: impl Into<String>, max_turns: u32) -> Self {
        Self {
            agent_id: agent_id.into(),
            max_turns,
            tools_json: None,
        }
    }

    pub fn with_tools_json(mut self, tools_json: impl Into<String>) -> Self {
        self.tools_json = Some(tools_json.into());
        self
    }
}

impl From<&AgentConfig> for RunConfig {
    fn from(cfg: &AgentConfig) -> Self {
        Self::new(cfg.agent_id.clone(), cfg.max_turns)
    }
}

/// Drives one conversation from `start()` to a terminal state.
///
/// The runtime owns the history, the failure counters, and the turn counter;
/// everything else (transport, tools, journal) is reached through values the
/// caller passes in.  One runtime per run; no shared state.
pub struct AgentRuntime {
    config: RunConfig,
    state: RunState,
    history: Vec<HistoryMessage>,
    turn: u32,
    run_id: String,
    usage: Usage,
    failover: FailoverState,
    sink: Option<Box<dyn EventSink>>,
}

const DEFAULT_FAILOVER_MAX_RETRIES: u32 = 3;
const DEFAULT_FAILOVER_COOLDOWN_MS: i64 = 60_000;

impl AgentRuntime {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            state: RunState::Idle,
            history: Vec::new(),
            turn: 0,
            run_id: Uuid::new_v4().to_string(),
            usage: Usage::default(),
            failover: FailoverState::new(
                DEFAULT_FAILOVER_MAX_RETRIES,
                DEFAULT_FAILOVER_COOLDOWN_MS,
            ),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn history(&self) -> &[HistoryMessage] {
        &self.history
    }

    /// Running totals across every parsed result of this run.
    pub fn total_usage(&self) -> Usage {
        self.usage
    }

    pub fn failover(&self) -> &FailoverState {
        &self.failover
    }

    pub fn failover_mut(&mut self) -> &mut FailoverState {
        &mut self.failover
    }

    // ── History ───────────────────────────────────────────────────────────────

    pub fn add_user_message(&mut self, text: &str) {
        self.history.push(HistoryMessage::user(text));
    }

    pub fn add_assistant_message(&mut self, text: &str) {
        self.history.push(HistoryMessage::assistant(text));
    }

    pub fn add_tool_result(&mut self, tool_call_id: &str, tool_name: &str, content: &str) {
        self.history
            .push(HistoryMessage::tool_result(tool_call_id, tool_name, content));
    }

    // ── State transitions ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if self.state != RunState::Idle {
            return Err(RuntimeError::InvalidState {
                op: "start",
                state: self.state,
            });
        }
        self.turn = 0;
        self.state = RunState::Running;
        debug!(run_id = %self.run_id, agent_id = %self.config.agent_id, "run started");
        self.emit(self.event(RunEventKind::Start));
        Ok(())
    }

    /// Advance to the next turn.  Returns false without error when the run is
    /// not in a drivable state; transitions to `Failed` when the turn budget
    /// is spent.
    pub fn next_turn(&mut self) -> bool {
        if !matches!(self.state, RunState::Running | RunState::WaitingTool) {
            return false;
        }
        if self.turn >= self.config.max_turns {
            self.state = RunState::Failed;
            warn!(run_id = %self.run_id, max_turns = self.config.max_turns, "max turns exceeded");
            let mut ev = self.event(RunEventKind::Error);
            ev.error_message = Some("max turns exceeded".into());
            self.emit(ev);
            return false;
        }
        self.turn += 1;
        self.state = RunState::Running;
        true
    }

    /// One inference call: serialize history in the dispatch's dialect, send,
    /// parse, account usage, and transition on the outcome.
    ///
    /// Any failure leaves the run `Failed` with an `error` event emitted
    /// before the error propagates.
    pub async fn run_inference(
        &mut self,
        dispatch: &ProviderDispatch,
    ) -> Result<RunResult, RuntimeError> {
        if self.state != RunState::Running {
            return Err(RuntimeError::InvalidState {
                op: "run_inference",
                state: self.state,
            });
        }

        let messages_json = build_history(dispatch.api_type(), &self.history);
        let provider_result = match dispatch
            .send_message(&messages_json, self.config.tools_json.as_deref())
            .await
        {
            Ok(r) => r,
            Err(e) => {
                // WireError's display already names the failure class.
                self.fail(e.to_string());
                return Err(e.into());
            }
        };

        if !provider_result.is_success() {
            let status = provider_result.status;
            self.fail(format!("provider returned error status {status}"));
            return Err(WireError::Provider {
                status,
                body: provider_result.body,
            }
            .into());
        }

        let result = match provider_result.parse_run_result() {
            Ok(r) => r,
            Err(e) => {
                self.fail(format!("response parse failed: {e}"));
                return Err(e.into());
            }
        };

        self.usage.add(&result.usage);

        if result.has_tool_calls() {
            self.state = RunState::WaitingTool;
            if let Some(text) = &result.text {
                self.add_assistant_message(text);
            }
            for call in &result.tool_calls {
                let mut ev = self.event(RunEventKind::ToolCall);
                ev.tool_name = Some(call.name.clone());
                ev.tool_call_id = Some(call.id.clone());
                ev.tool_input = Some(call.input_json.clone());
                self.emit(ev);
            }
        } else if let Some(text) = &result.text {
            self.add_assistant_message(text);
            let mut ev = self.event(RunEventKind::Delta);
            ev.text = Some(text.clone());
            self.emit(ev);
        }

        Ok(result)
    }

    /// Record a provider failure against its failover key.  The caller (or a
    /// higher retry layer) consults the reason's policy for what to do next.
    pub fn record_provider_failure(
        &mut self,
        provider: &str,
        model: &str,
        reason: FailoverReason,
    ) {
        let key = build_failover_key(provider, model);
        self.failover.record_failure(&key, reason);
    }

    /// Re-inject tool results and hand the turn back to the model.
    pub fn submit_tool_results(
        &mut self,
        results: Vec<ToolResultInput>,
    ) -> Result<(), RuntimeError> {
        if self.state != RunState::WaitingTool {
            return Err(RuntimeError::InvalidState {
                op: "submit_tool_results",
                state: self.state,
            });
        }
        for r in results {
            self.add_tool_result(&r.tool_call_id, &r.tool_name, &r.content);
            let mut ev = self.event(RunEventKind::ToolResult);
            ev.tool_call_id = Some(r.tool_call_id);
            ev.tool_name = Some(r.tool_name);
            ev.text = Some(r.content);
            self.emit(ev);
        }
        self.state = RunState::Running;
        Ok(())
    }

    pub fn complete(&mut self, text: Option<&str>) -> Result<(), RuntimeError> {
        if self.state.is_terminal() {
            return Err(RuntimeError::InvalidState {
                op: "complete",
                state: self.state,
            });
        }
        self.state = RunState::Completed;
        let mut ev = self.event(RunEventKind::Complete);
        ev.text = text.map(str::to_string);
        self.emit(ev);
        Ok(())
    }

    /// Force a terminal state from the driving thread.  Does not interrupt an
    /// in-flight transport call; a no-op once the run is already terminal.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = RunState::Aborted;
        self.emit(self.event(RunEventKind::Abort));
    }

    /// Whether accumulated history has outgrown the context budget.
    ///
    /// Byte-count heuristic at ~4 bytes/token against 4/5 of the window,
    /// in integer arithmetic.  Zero history never needs compaction, including
    /// when the budget itself is zero.
    pub fn needs_compaction(&self, max_context_tokens: u64) -> bool {
        let bytes: u64 = self.history.iter().map(|m| m.content.len() as u64).sum();
        bytes / 4 > max_context_tokens * 4 / 5
    }

    /// Announce that the driver compacted history, with an optional summary.
    pub fn emit_compaction(&mut self, summary: Option<&str>) {
        let mut ev = self.event(RunEventKind::Compaction);
        ev.text = summary.map(str::to_string);
        self.emit(ev);
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn fail(&mut self, message: String) {
        self.state = RunState::Failed;
        warn!(run_id = %self.run_id, "{message}");
        let mut ev = self.event(RunEventKind::Error);
        ev.error_message = Some(message);
        self.emit(ev);
    }

    fn event(&self, kind: RunEventKind) -> RunEvent {
        RunEvent::new(kind, &self.config.agent_id, &self.run_id, self.turn)
    }

    fn emit(&self, event: RunEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingSink;

    fn runtime() -> AgentRuntime {
        AgentRuntime::new(RunConfig::new("main", 8))
    }

    // ── Identity ──────────────────────────────────────────────────────────────

    #[test]
    fn run_id_is_36_chars_and_unique() {
        let a = runtime();
        let b = runtime();
        assert_eq!(a.run_id().len(), 36);
        assert_ne!(a.run_id(), b.run_id());
    }

    // ── State machine ─────────────────────────────────────────────────────────

    #[test]
    fn new_runtime_is_idle() {
        let rt = runtime();
        assert_eq!(rt.state(), RunState::Idle);
        assert_eq!(rt.turn(), 0);
    }

    #[test]
    fn start_requires_idle() {
        let mut rt = runtime();
        rt.start().unwrap();
        assert_eq!(rt.state(), RunState::Running);
        let err = rt.start().unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidState { op: "start", .. }));
    }

    #[test]
    fn next_turn_false_from_idle() {
        let mut rt = runtime();
        assert!(!rt.next_turn());
        assert_eq!(rt.state(), RunState::Idle);
    }

    #[test]
    fn next_turn_increments_counter() {
        let mut rt = runtime();
        rt.start().unwrap();
        assert!(rt.next_turn());
        assert_eq!(rt.turn(), 1);
        assert!(rt.next_turn());
        assert_eq!(rt.turn(), 2);
    }

    #[test]
    fn next_turn_fails_run_at_budget() {
        let mut rt = AgentRuntime::new(RunConfig::new("main", 1));
        rt.start().unwrap();
        assert!(rt.next_turn());
        assert!(!rt.next_turn());
        assert_eq!(rt.state(), RunState::Failed);
    }

    #[test]
    fn max_turns_emits_error_event() {
        let sink = CollectingSink::new();
        let mut rt = AgentRuntime::new(RunConfig::new("main", 0)).with_sink(Box::new(sink.clone()));
        rt.start().unwrap();
        assert!(!rt.next_turn());
        let events = sink.events();
        let err = events
            .iter()
            .find(|e| e.kind == RunEventKind::Error)
            .expect("error event");
        assert_eq!(err.error_message.as_deref(), Some("max turns exceeded"));
    }

    #[test]
    fn submit_tool_results_requires_waiting_tool() {
        let mut rt = runtime();
        rt.start().unwrap();
        let err = rt.submit_tool_results(vec![]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::InvalidState {
                op: "submit_tool_results",
                ..
            }
        ));
        // The failed call must not change state.
        assert_eq!(rt.state(), RunState::Running);
    }

    #[test]
    fn complete_is_terminal() {
        let mut rt = runtime();
        rt.start().unwrap();
        rt.complete(Some("bye")).unwrap();
        assert_eq!(rt.state(), RunState::Completed);
        assert!(rt.complete(None).is_err());
        assert!(!rt.next_turn());
    }

    #[test]
    fn abort_from_any_live_state() {
        let mut rt = runtime();
        rt.abort();
        assert_eq!(rt.state(), RunState::Aborted);
        // Aborting again stays terminal and emits nothing new.
        let sink = CollectingSink::new();
        let mut rt2 = runtime().with_sink(Box::new(sink.clone()));
        rt2.start().unwrap();
        rt2.abort();
        rt2.abort();
        let aborts = sink
            .events()
            .iter()
            .filter(|e| e.kind == RunEventKind::Abort)
            .count();
        assert_eq!(aborts, 1);
        assert_eq!(rt2.state(), RunState::Aborted);
    }

    // ── History ───────────────────────────────────────────────────────────────

    #[test]
    fn messages_append_in_order() {
        let mut rt = runtime();
        rt.add_user_message("q");
        rt.add_assistant_message("a");
        rt.add_tool_result("id", "bash", "out");
        assert_eq!(rt.history().len(), 3);
        assert_eq!(rt.history()[2].tool_call_id.as_deref(), Some("id"));
    }

    // ── Compaction heuristic ──────────────────────────────────────────────────

    #[test]
    fn empty_history_never_needs_compaction() {
        let rt = runtime();
        assert!(!rt.needs_compaction(0));
        assert!(!rt.needs_compaction(100_000));
    }

    #[test]
    fn compaction_threshold_uses_integer_arithmetic() {
        let mut rt = runtime();
        // 100 bytes → 25 "tokens".  Budget 31: 31*4/5 = 24 → 25 > 24 → true.
        rt.add_user_message(&"x".repeat(100));
        assert!(rt.needs_compaction(31));
        // Budget 32: 32*4/5 = 25 (integer) → 25 > 25 is false.
        assert!(!rt.needs_compaction(32));
    }

    #[test]
    fn compaction_event_carries_summary() {
        let sink = CollectingSink::new();
        let mut rt = runtime().with_sink(Box::new(sink.clone()));
        rt.emit_compaction(Some("squashed 10 turns"));
        let events = sink.events();
        assert_eq!(events[0].kind, RunEventKind::Compaction);
        assert_eq!(events[0].text.as_deref(), Some("squashed 10 turns"));
    }

    // ── Failover embedding ────────────────────────────────────────────────────

    #[test]
    fn provider_failures_accumulate_under_key() {
        let mut rt = runtime();
        rt.record_provider_failure("anthropic", "claude-opus-4-5", FailoverReason::RateLimit);
        rt.record_provider_failure("anthropic", "claude-opus-4-5", FailoverReason::RateLimit);
        assert_eq!(rt.failover().failure_count("anthropic:claude-opus-4-5"), 2);
        assert_eq!(rt.failover().failure_count("openai:gpt-4o"), 0);
    }
}
