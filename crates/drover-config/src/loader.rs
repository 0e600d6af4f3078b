// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Layered config loading.
//!
//! Discovery walks a fixed set of locations from system-wide to
//! workspace-local; every file found becomes a [`ConfigLayer`] — the same
//! sections as [`Config`] with every field optional — applied on top of the
//! defaults.  A layer only touches the fields it actually sets, so a
//! workspace file can override one knob without restating the rest.  Named
//! `providers` entries are complete endpoint definitions and replace
//! same-named entries from earlier layers wholesale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::{AgentConfig, Config, FailoverConfig, ModelConfig};

/// Candidate config files, lowest to highest priority.
fn layer_paths() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![PathBuf::from("/etc/drover")];
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".config/drover"));
    }
    if let Some(cfg) = dirs::config_dir() {
        dirs.push(cfg.join("drover"));
    }
    dirs.push(PathBuf::from(".drover"));

    dirs.into_iter()
        .flat_map(|d| ["config.yaml", "config.yml"].map(|f| d.join(f)))
        .collect()
}

/// Load configuration: defaults, then every discovered layer, then `extra`.
///
/// Discovered files are optional; a missing `extra` path is an error since
/// the caller named it explicitly.
pub fn load(extra: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();

    for path in layer_paths() {
        if !path.is_file() {
            continue;
        }
        debug!(path = %path.display(), "applying config layer");
        read_layer(&path)?.apply(&mut config);
    }

    if let Some(path) = extra {
        debug!(path = %path.display(), "applying explicit config");
        read_layer(path)?.apply(&mut config);
    }

    Ok(config)
}

fn read_layer(path: &Path) -> anyhow::Result<ConfigLayer> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

// ─── Layer types ──────────────────────────────────────────────────────────────

/// One config file's contribution: [`Config`] with every field optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigLayer {
    agent: Option<AgentLayer>,
    model: Option<ModelLayer>,
    failover: Option<FailoverLayer>,
    #[serde(default)]
    providers: HashMap<String, ModelConfig>,
}

impl ConfigLayer {
    fn apply(self, config: &mut Config) {
        if let Some(agent) = self.agent {
            agent.apply(&mut config.agent);
        }
        if let Some(model) = self.model {
            model.apply(&mut config.model);
        }
        if let Some(failover) = self.failover {
            failover.apply(&mut config.failover);
        }
        config.providers.extend(self.providers);
    }
}

#[derive(Debug, Default, Deserialize)]
struct AgentLayer {
    agent_id: Option<String>,
    max_turns: Option<u32>,
    max_context_tokens: Option<u64>,
    session_dir: Option<PathBuf>,
}

impl AgentLayer {
    fn apply(self, agent: &mut AgentConfig) {
        if let Some(v) = self.agent_id {
            agent.agent_id = v;
        }
        if let Some(v) = self.max_turns {
            agent.max_turns = v;
        }
        if let Some(v) = self.max_context_tokens {
            agent.max_context_tokens = v;
        }
        if let Some(v) = self.session_dir {
            agent.session_dir = Some(v);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModelLayer {
    provider: Option<String>,
    name: Option<String>,
    api_key: Option<String>,
    api_key_env: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl ModelLayer {
    fn apply(self, model: &mut ModelConfig) {
        if let Some(v) = self.provider {
            model.provider = v;
        }
        if let Some(v) = self.name {
            model.name = v;
        }
        if let Some(v) = self.api_key {
            model.api_key = Some(v);
        }
        if let Some(v) = self.api_key_env {
            model.api_key_env = Some(v);
        }
        if let Some(v) = self.base_url {
            model.base_url = Some(v);
        }
        if let Some(v) = self.max_tokens {
            model.max_tokens = Some(v);
        }
        if let Some(v) = self.temperature {
            model.temperature = Some(v);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FailoverLayer {
    max_retries: Option<u32>,
    cooldown_ms: Option<i64>,
}

impl FailoverLayer {
    fn apply(self, failover: &mut FailoverConfig) {
        if let Some(v) = self.max_retries {
            failover.max_retries = v;
        }
        if let Some(v) = self.cooldown_ms {
            failover.cooldown_ms = v;
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
