// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

use crate::runtime::RunState;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An operation was invoked from a state that forbids it.  The state is
    /// left unchanged.
    #[error("{op} is not valid in state {state:?}")]
    InvalidState { op: &'static str, state: RunState },

    #[error(transparent)]
    Wire(#[from] drover_model::WireError),

    #[error("journal i/o: {0}")]
    Journal(#[from] std::io::Error),
}
