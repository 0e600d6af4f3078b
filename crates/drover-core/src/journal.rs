// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Append-only line-delimited session journal.
//!
//! Each line is one self-describing JSON object; the `"type"` field carries
//! the line kind.  A well-formed file starts with a `session` header, but the
//! reader tolerates its absence — older files and truncated copies still load.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde_json::{json, Value};
use tracing::warn;

use crate::runtime::AgentRuntime;

/// On-disk schema version written into the header line.
pub const JOURNAL_VERSION: u32 = 3;

/// `"agent:{agent_id}[:{part}]*"` — addresses one session within a store.
pub fn build_session_key(agent_id: &str, parts: &[&str]) -> String {
    let mut key = format!("agent:{agent_id}");
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

// ─── Writer ───────────────────────────────────────────────────────────────────

/// Appends journal lines to a session file.
///
/// The file is created owner-readable only (0600 on unix), missing parent
/// directories are created, and an existing file is appended to — never
/// truncated.
pub struct JournalWriter {
    file: File,
}

impl JournalWriter {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut opts = OpenOptions::new();
        opts.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        Ok(Self {
            file: opts.open(path)?,
        })
    }

    /// `{"type":"session","version":3,"id":ID}` — should be the first line.
    pub fn write_header(&mut self, id: &str) -> io::Result<()> {
        self.write_line(&json!({
            "type": "session",
            "version": JOURNAL_VERSION,
            "id": id,
        }))
    }

    pub fn write_message(&mut self, role: &str, text: &str, timestamp_ms: i64) -> io::Result<()> {
        self.write_line(&json!({
            "type": "message",
            "message": {
                "role": role,
                "content": [{ "type": "text", "text": text }],
                "timestamp": timestamp_ms,
            }
        }))
    }

    /// Convenience: message line stamped with the current wall clock.
    pub fn write_message_now(&mut self, role: &str, text: &str) -> io::Result<()> {
        self.write_message(role, text, chrono::Utc::now().timestamp_millis())
    }

    pub fn write_usage(&mut self, input_tokens: u64, output_tokens: u64) -> io::Result<()> {
        self.write_line(&json!({
            "type": "usage",
            "input_tokens": input_tokens,
            "output_tokens": output_tokens,
        }))
    }

    pub fn write_compaction(&mut self, summary: &str) -> io::Result<()> {
        self.write_line(&json!({
            "type": "compaction",
            "summary": summary,
        }))
    }

    fn write_line(&mut self, value: &Value) -> io::Result<()> {
        writeln!(self.file, "{value}")
    }
}

// ─── Reader ───────────────────────────────────────────────────────────────────

/// One recognized journal line.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalLine {
    Session {
        version: u32,
        id: String,
    },
    Message {
        role: String,
        text: String,
        timestamp_ms: i64,
    },
    Compaction {
        summary: String,
    },
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },
}

/// The recognized lines of one journal file, in file order.
#[derive(Debug, Default)]
pub struct JournalReader {
    lines: Vec<JournalLine>,
}

impl JournalReader {
    pub fn read(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match classify_line(&line) {
                Some(parsed) => lines.push(parsed),
                None => warn!("skipping unrecognized journal line"),
            }
        }
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[JournalLine] {
        &self.lines
    }

    pub fn message_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, JournalLine::Message { .. }))
            .count()
    }

    /// Sum of `input_tokens` / `output_tokens` across every usage line.
    pub fn total_tokens(&self) -> (u64, u64) {
        let mut input = 0u64;
        let mut output = 0u64;
        for line in &self.lines {
            if let JournalLine::Usage {
                input_tokens,
                output_tokens,
            } = line
            {
                input += input_tokens;
                output += output_tokens;
            }
        }
        (input, output)
    }

    /// True iff the file began with a session header.
    pub fn has_header(&self) -> bool {
        matches!(self.lines.first(), Some(JournalLine::Session { .. }))
    }

    /// Re-append this journal's conversation into `runtime` so a stored
    /// session can resume.  Compaction markers become a single synthetic
    /// assistant entry carrying the summary; unknown roles are dropped.
    pub fn replay_into(&self, runtime: &mut AgentRuntime) {
        for line in &self.lines {
            match line {
                JournalLine::Message { role, text, .. } => match role.as_str() {
                    "user" => runtime.add_user_message(text),
                    "assistant" => runtime.add_assistant_message(text),
                    "tool_result" => runtime.add_tool_result("", "", text),
                    other => warn!(role = other, "dropping message with unknown role"),
                },
                JournalLine::Compaction { summary } => runtime.add_assistant_message(summary),
                JournalLine::Session { .. } | JournalLine::Usage { .. } => {}
            }
        }
    }
}

/// Classify by scanning the raw text for type markers, first match wins, then
/// parse the full JSON for fields.  Lines that match a marker but fail to
/// parse are dropped like unrecognized ones.
fn classify_line(line: &str) -> Option<JournalLine> {
    if line.contains(r#""type":"session""#) {
        let v: Value = serde_json::from_str(line).ok()?;
        Some(JournalLine::Session {
            version: v["version"].as_u64().unwrap_or(0) as u32,
            id: v["id"].as_str().unwrap_or("").to_string(),
        })
    } else if line.contains(r#""type":"message""#) {
        let v: Value = serde_json::from_str(line).ok()?;
        let m = &v["message"];
        Some(JournalLine::Message {
            role: m["role"].as_str().unwrap_or("").to_string(),
            text: m["content"][0]["text"].as_str().unwrap_or("").to_string(),
            timestamp_ms: m["timestamp"].as_i64().unwrap_or(0),
        })
    } else if line.contains(r#""type":"compaction""#) {
        let v: Value = serde_json::from_str(line).ok()?;
        Some(JournalLine::Compaction {
            summary: v["summary"].as_str().unwrap_or("").to_string(),
        })
    } else if line.contains(r#""type":"usage""#) {
        let v: Value = serde_json::from_str(line).ok()?;
        Some(JournalLine::Usage {
            input_tokens: v["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: v["output_tokens"].as_u64().unwrap_or(0),
        })
    } else {
        None
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
