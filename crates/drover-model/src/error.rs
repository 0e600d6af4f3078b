// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

use crate::types::ApiType;

/// Failures at the provider boundary.
#[derive(Debug, Error)]
pub enum WireError {
    /// The transport could not complete the request at all.
    #[error("provider call failed: {0}")]
    Transport(#[source] anyhow::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned error status {status}")]
    Provider { status: u16, body: String },

    /// The dispatch holds no client able to serve the requested API type.
    #[error("no handler for provider api type {0:?}")]
    UnsupportedProvider(ApiType),

    /// A request or response payload had a shape that cannot be processed.
    #[error("malformed payload: {0}")]
    Parse(String),

    /// No API key was configured for a provider that requires one.
    #[error("{provider} API key not set; provide api_key or api_key_env in config")]
    MissingApiKey { provider: &'static str },
}
