// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Mutex;

use async_trait::async_trait;

use crate::transport::{HttpResponse, Transport};

/// A request recorded by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Pre-scripted transport for tests.  Each call pops the next response from
/// the front of the queue and records the request so tests can assert on the
/// exact bytes a client sent — no network access required.
pub struct ScriptedTransport {
    responses: Mutex<Vec<HttpResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: a transport that always answers 200 with `body`.
    pub fn ok_with(body: impl Into<String>) -> Self {
        Self::new(vec![HttpResponse {
            status: 200,
            body: body.into(),
        }])
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record_and_pop(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> anyhow::Result<HttpResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.to_vec(),
            body: body.to_string(),
        });
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            anyhow::bail!("scripted transport exhausted (unexpected request to {url})");
        }
        Ok(responses.remove(0))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> anyhow::Result<HttpResponse> {
        self.record_and_pop(url, headers, body)
    }

    async fn get(&self, url: &str, headers: &[(String, String)]) -> anyhow::Result<HttpResponse> {
        self.record_and_pop(url, headers, "")
    }
}

/// Transport whose every call fails.  Exercises the transport-failure path.
pub struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn post_json(
        &self,
        url: &str,
        _headers: &[(String, String)],
        _body: &str,
    ) -> anyhow::Result<HttpResponse> {
        anyhow::bail!("connection refused: {url}")
    }

    async fn get(&self, url: &str, _headers: &[(String, String)]) -> anyhow::Result<HttpResponse> {
        anyhow::bail!("connection refused: {url}")
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
