// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

fn default_agent_id() -> String {
    "main".into()
}

fn default_max_turns() -> u32 {
    16
}

fn default_max_context_tokens() -> u64 {
    200_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_cooldown_ms() -> i64 {
    60_000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub failover: FailoverConfig,
    /// Named provider configurations.
    ///
    /// Define custom endpoints or additional accounts here and reference them
    /// by name when constructing a dispatch:
    ///
    /// ```yaml
    /// providers:
    ///   local_llama:
    ///     provider: compat
    ///     base_url: http://localhost:11434/v1
    ///     name: llama3.2
    /// ```
    #[serde(default)]
    pub providers: std::collections::HashMap<String, ModelConfig>,
}

/// Connection settings for one inference provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier: "anthropic" | "openai" | "google" | "compat",
    /// or a known OpenAI-compatible gateway id ("openrouter", "groq", ...).
    pub provider: String,
    /// Model name forwarded to the provider API.
    pub name: String,
    /// Explicit API key; prefer `api_key_env` in version-controlled files.
    pub api_key: Option<String>,
    /// Environment variable that holds the API key (read at runtime).
    pub api_key_env: Option<String>,
    /// Base URL override.  Required for self-hosted compat endpoints; for
    /// hosted providers the correct default is selected automatically.
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion.
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0).
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".into(),
            name: "claude-opus-4-5".into(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            max_tokens: None,
            temperature: None,
        }
    }
}

impl ModelConfig {
    /// Resolve the API key for this endpoint.
    ///
    /// Precedence: explicit `api_key`, then the `api_key_env` variable, then
    /// the provider's conventional environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(k) = &self.api_key {
            return Some(k.clone());
        }
        if let Some(env) = &self.api_key_env {
            return std::env::var(env).ok();
        }
        default_api_key_env(&self.provider).and_then(|var| std::env::var(var).ok())
    }
}

/// Conventional API-key environment variable for a provider id.
pub fn default_api_key_env(provider: &str) -> Option<&'static str> {
    match provider {
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "google" | "gemini" => Some("GEMINI_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        "groq" => Some("GROQ_API_KEY"),
        "deepseek" => Some("DEEPSEEK_API_KEY"),
        _ => None,
    }
}

/// Settings for the run loop itself, independent of any provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Stable identifier stamped onto run events and session keys.
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    /// Hard ceiling on inference turns per run.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Context window budget used by the compaction check.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u64,
    /// Directory for session journal files.  `None` disables journaling.
    #[serde(default)]
    pub session_dir: Option<std::path::PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_id: default_agent_id(),
            max_turns: default_max_turns(),
            max_context_tokens: default_max_context_tokens(),
            session_dir: None,
        }
    }
}

/// Cooldown policy for the per-`provider:model` failure counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// Failures required before a key enters cooldown.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Cooldown window in milliseconds.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: i64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
