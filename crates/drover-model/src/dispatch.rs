// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Provider dispatch: a closed, tagged set of per-dialect clients.
//!
//! The provider boundary is deliberately NOT a trait object.  The four wire
//! shapes differ enough — tool-result encoding above all — that a uniform
//! client trait would hide the behaviour that matters.  A dispatch value is
//! built by exactly one `init_*` constructor and owns exactly one client.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use drover_config::ModelConfig;

use crate::error::WireError;
use crate::result::ProviderResult;
use crate::transport::{HttpResponse, Transport};
use crate::types::ApiType;

const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Local-endpoint default for compat clients when no base URL is configured.
const COMPAT_DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

fn parse_json_payload(what: &str, payload: &str) -> Result<Value, WireError> {
    serde_json::from_str(payload).map_err(|e| WireError::Parse(format!("{what}: {e}")))
}

// ─── Anthropic Messages client ────────────────────────────────────────────────

pub struct AnthropicClient {
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    transport: Arc<dyn Transport>,
}

impl AnthropicClient {
    fn new(cfg: &ModelConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            model: cfg.name.clone(),
            api_key: cfg.resolve_api_key(),
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.anthropic.com".into()),
            max_tokens: cfg.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: cfg.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            transport,
        }
    }

    async fn send(
        &self,
        messages_json: &str,
        tools_json: Option<&str>,
    ) -> Result<HttpResponse, WireError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(WireError::MissingApiKey {
                provider: "anthropic",
            })?;
        let messages = parse_json_payload("messages payload", messages_json)?;
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "stream": true,
            "messages": messages,
        });
        if let Some(tools) = tools_json {
            body["tools"] = parse_json_payload("tools payload", tools)?;
        }
        let headers = vec![
            ("x-api-key".to_string(), key.to_string()),
            ("anthropic-version".to_string(), "2023-06-01".to_string()),
        ];
        debug!(model = %self.model, "sending anthropic request");
        self.transport
            .post_json(
                &format!("{}/v1/messages", self.base_url.trim_end_matches('/')),
                &headers,
                &body.to_string(),
            )
            .await
            .map_err(WireError::Transport)
    }
}

// ─── OpenAI Chat Completions client ───────────────────────────────────────────

pub struct OpenAiClient {
    model: String,
    api_key: Option<String>,
    chat_url: String,
    max_tokens: u32,
    temperature: f32,
    transport: Arc<dyn Transport>,
}

impl OpenAiClient {
    fn new(cfg: &ModelConfig, transport: Arc<dyn Transport>) -> Self {
        let base = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".into());
        Self {
            model: cfg.name.clone(),
            api_key: cfg.resolve_api_key(),
            chat_url: format!("{}/chat/completions", base.trim_end_matches('/')),
            max_tokens: cfg.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: cfg.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            transport,
        }
    }

    async fn send(
        &self,
        messages_json: &str,
        tools_json: Option<&str>,
    ) -> Result<HttpResponse, WireError> {
        let key = self.api_key.as_deref().ok_or(WireError::MissingApiKey {
            provider: "openai",
        })?;
        let body = build_completions_body(
            &self.model,
            self.max_tokens,
            self.temperature,
            messages_json,
            tools_json,
        )?;
        let headers = vec![("authorization".to_string(), format!("Bearer {key}"))];
        debug!(model = %self.model, "sending openai request");
        self.transport
            .post_json(&self.chat_url, &headers, &body.to_string())
            .await
            .map_err(WireError::Transport)
    }
}

// ─── OpenAI-compatible gateway client ─────────────────────────────────────────

/// Same wire shape as [`OpenAiClient`] with a configurable endpoint and
/// optional auth — local servers run keyless.
pub struct CompatClient {
    driver_name: String,
    model: String,
    api_key: Option<String>,
    chat_url: String,
    max_tokens: u32,
    temperature: f32,
    transport: Arc<dyn Transport>,
}

impl CompatClient {
    fn new(driver_name: &str, cfg: &ModelConfig, transport: Arc<dyn Transport>) -> Self {
        let base = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| COMPAT_DEFAULT_BASE_URL.into());
        Self {
            driver_name: driver_name.to_string(),
            model: cfg.name.clone(),
            api_key: cfg.resolve_api_key(),
            chat_url: format!("{}/chat/completions", base.trim_end_matches('/')),
            max_tokens: cfg.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: cfg.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            transport,
        }
    }

    async fn send(
        &self,
        messages_json: &str,
        tools_json: Option<&str>,
    ) -> Result<HttpResponse, WireError> {
        let body = build_completions_body(
            &self.model,
            self.max_tokens,
            self.temperature,
            messages_json,
            tools_json,
        )?;
        let mut headers = Vec::new();
        if let Some(key) = &self.api_key {
            headers.push(("authorization".to_string(), format!("Bearer {key}")));
        }
        debug!(driver = %self.driver_name, model = %self.model, "sending compat request");
        self.transport
            .post_json(&self.chat_url, &headers, &body.to_string())
            .await
            .map_err(WireError::Transport)
    }
}

fn build_completions_body(
    model: &str,
    max_tokens: u32,
    temperature: f32,
    messages_json: &str,
    tools_json: Option<&str>,
) -> Result<Value, WireError> {
    let messages = parse_json_payload("messages payload", messages_json)?;
    let mut body = json!({
        "model": model,
        "messages": messages,
        "stream": true,
        "max_tokens": max_tokens,
        "temperature": temperature,
        "stream_options": { "include_usage": true },
    });
    if let Some(tools) = tools_json {
        body["tools"] = parse_json_payload("tools payload", tools)?;
    }
    Ok(body)
}

// ─── Google generative client ─────────────────────────────────────────────────

pub struct GeminiClient {
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    transport: Arc<dyn Transport>,
}

impl GeminiClient {
    fn new(cfg: &ModelConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            model: cfg.name.clone(),
            api_key: cfg.resolve_api_key(),
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".into()),
            max_tokens: cfg.max_tokens.unwrap_or(8192),
            temperature: cfg.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            transport,
        }
    }

    async fn send(
        &self,
        messages_json: &str,
        tools_json: Option<&str>,
    ) -> Result<HttpResponse, WireError> {
        let key = self.api_key.as_deref().ok_or(WireError::MissingApiKey {
            provider: "google",
        })?;
        let contents = parse_json_payload("messages payload", messages_json)?;
        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.max_tokens,
                "temperature": self.temperature,
            }
        });
        if let Some(tools) = tools_json {
            let declarations = parse_json_payload("tools payload", tools)?;
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            key,
        );
        debug!(model = %self.model, "sending google request");
        self.transport
            .post_json(&url, &[], &body.to_string())
            .await
            .map_err(WireError::Transport)
    }
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

enum ProviderClient {
    Anthropic(AnthropicClient),
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
    Compat(CompatClient),
}

/// Routes normalized requests to the single client it was initialized with,
/// tagging every response with the client's wire dialect.
pub struct ProviderDispatch {
    api_type: ApiType,
    client: ProviderClient,
}

impl ProviderDispatch {
    pub fn init_anthropic(cfg: &ModelConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_type: ApiType::AnthropicMessages,
            client: ProviderClient::Anthropic(AnthropicClient::new(cfg, transport)),
        }
    }

    pub fn init_openai(cfg: &ModelConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_type: ApiType::OpenAiCompletions,
            client: ProviderClient::OpenAi(OpenAiClient::new(cfg, transport)),
        }
    }

    pub fn init_gemini(cfg: &ModelConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_type: ApiType::GoogleGenerative,
            client: ProviderClient::Gemini(GeminiClient::new(cfg, transport)),
        }
    }

    /// OpenAI-compatible gateway; the tag stays [`ApiType::OpenAiCompletions`].
    pub fn init_compat(
        driver_name: &str,
        cfg: &ModelConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            api_type: ApiType::OpenAiCompletions,
            client: ProviderClient::Compat(CompatClient::new(driver_name, cfg, transport)),
        }
    }

    /// The dialect this dispatch speaks; history must be serialized in it.
    pub fn api_type(&self) -> ApiType {
        self.api_type
    }

    /// Forward one request to the initialized client.
    ///
    /// Compat and Gemini clients route on the variant itself; the API-type tag
    /// only selects among the remaining native clients.  A tag that matches no
    /// client is `UnsupportedProvider`.
    pub async fn send_message(
        &self,
        messages_json: &str,
        tools_json: Option<&str>,
    ) -> Result<ProviderResult, WireError> {
        let resp = match (&self.client, self.api_type) {
            (ProviderClient::Compat(c), _) => c.send(messages_json, tools_json).await?,
            (ProviderClient::Gemini(c), _) => c.send(messages_json, tools_json).await?,
            (ProviderClient::Anthropic(c), ApiType::AnthropicMessages) => {
                c.send(messages_json, tools_json).await?
            }
            (ProviderClient::OpenAi(c), ApiType::OpenAiCompletions) => {
                c.send(messages_json, tools_json).await?
            }
            _ => return Err(WireError::UnsupportedProvider(self.api_type)),
        };
        Ok(ProviderResult {
            status: resp.status,
            body: resp.body,
            api_type: self.api_type,
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
