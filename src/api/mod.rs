// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP API for the QA node
//!
//! Exposes the conversational entrypoint (`POST /chat`) and a health probe
//! (`GET /health`).

pub mod server;

pub use server::{router, run_server};

use serde::{Deserialize, Serialize};

/// One message in a chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

/// Request body for `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation history, oldest first, ending with the user's turn
    pub messages: Vec<ApiMessage>,
}

/// Response body for `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant's answer
    pub response: String,
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status string
    pub status: String,
    /// Whether the agent finished initializing
    pub agent_initialized: bool,
}
