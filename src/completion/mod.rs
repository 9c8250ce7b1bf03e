// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text completion service boundary
//!
//! Routing, judging, and answer generation all go through one chat
//! completion interface. The service is external; calls carry timeouts and
//! bounded retry with exponential backoff.

pub mod client;

pub use client::HttpCompletionClient;

use async_trait::async_trait;
use thiserror::Error;

/// One role-tagged message in a completion request
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessage {
    /// "system", "user", or "assistant"
    pub role: &'static str,
    /// Message text
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Errors from the completion boundary
#[derive(Error, Debug)]
pub enum GenerationError {
    /// HTTP-level failure from the provider
    #[error("Completion API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Request timed out
    #[error("Completion request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Response body did not parse or contained no choices
    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    /// All retry attempts failed
    #[error("Completion failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

impl GenerationError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout { .. } => true,
            GenerationError::ApiError { status, .. } => {
                *status == 429 || *status >= 500 || *status == 0
            }
            _ => false,
        }
    }
}

/// Boundary trait for text completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for the given messages.
    ///
    /// `temperature` overrides the configured default when set; routing and
    /// judging pass 0.0 for stable decisions.
    async fn complete(
        &self,
        messages: &[PromptMessage],
        temperature: Option<f32>,
    ) -> Result<String, GenerationError>;
}
