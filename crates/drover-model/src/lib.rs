// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
pub mod sse;
pub mod mock;
mod anthropic;
mod dispatch;
mod error;
mod google;
mod history;
mod openai;
mod result;
mod transport;
mod types;

pub use dispatch::ProviderDispatch;
pub use error::WireError;
pub use history::build_history;
pub use result::{reduce_stream, ProviderResult};
pub use transport::{HttpResponse, HttpTransport, Transport};
pub use types::*;

use std::sync::Arc;

use anyhow::bail;
use drover_config::ModelConfig;

/// Known OpenAI-compatible gateway ids and their default base URLs.
///
/// A gateway entry here only changes the endpoint; the wire dialect stays
/// OpenAI Chat Completions.
const COMPAT_GATEWAYS: &[(&str, &str)] = &[
    ("openrouter", "https://openrouter.ai/api/v1"),
    ("groq", "https://api.groq.com/openai/v1"),
    ("deepseek", "https://api.deepseek.com/v1"),
    ("ollama", "http://localhost:11434/v1"),
];

/// Construct a [`ProviderDispatch`] from configuration.
///
/// Selects the client variant from `cfg.provider`.  `"compat"` targets a
/// generic OpenAI-compatible endpoint; the gateway ids in [`COMPAT_GATEWAYS`]
/// fill in their default base URLs when the config leaves `base_url` unset.
pub fn from_config(
    cfg: &ModelConfig,
    transport: Arc<dyn Transport>,
) -> anyhow::Result<ProviderDispatch> {
    match cfg.provider.as_str() {
        "anthropic" => Ok(ProviderDispatch::init_anthropic(cfg, transport)),
        "openai" => Ok(ProviderDispatch::init_openai(cfg, transport)),
        "google" | "gemini" => Ok(ProviderDispatch::init_gemini(cfg, transport)),
        "compat" => Ok(ProviderDispatch::init_compat("compat", cfg, transport)),
        other => {
            if let Some(&(id, default_base)) =
                COMPAT_GATEWAYS.iter().find(|(id, _)| *id == other)
            {
                let mut gw_cfg = cfg.clone();
                if gw_cfg.base_url.is_none() {
                    gw_cfg.base_url = Some(default_base.to_string());
                }
                return Ok(ProviderDispatch::init_compat(id, &gw_cfg, transport));
            }
            bail!(
                "unknown model provider: {other:?}\n\
                 Known providers: anthropic, openai, google, compat, {}",
                COMPAT_GATEWAYS
                    .iter()
                    .map(|(id, _)| *id)
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
    }
}
