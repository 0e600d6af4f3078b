// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Pluggable HTTP transport consumed by the provider clients.
//!
//! Implementations return complete responses only: either the full status and
//! body arrive, or the call errors.  Partial bodies are never surfaced, which
//! is what lets the SSE layer parse a finished stream in one pass.

use anyhow::Context;
use async_trait::async_trait;

/// A complete HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> anyhow::Result<HttpResponse>;

    async fn get(&self, url: &str, headers: &[(String, String)]) -> anyhow::Result<HttpResponse>;
}

/// Production transport over a shared `reqwest` client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> anyhow::Result<HttpResponse> {
        let mut req = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        for (name, val) in headers {
            req = req.header(name.as_str(), val.as_str());
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading response body from {url}"))?;
        Ok(HttpResponse { status, body })
    }

    async fn get(&self, url: &str, headers: &[(String, String)]) -> anyhow::Result<HttpResponse> {
        let mut req = self.client.get(url);
        for (name, val) in headers {
            req = req.header(name.as_str(), val.as_str());
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading response body from {url}"))?;
        Ok(HttpResponse { status, body })
    }
}
