// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP completion client
//!
//! Speaks the OpenAI-style `POST /v1/chat/completions` protocol.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CompletionConfig;

use super::{CompletionProvider, GenerationError, PromptMessage};

/// Completion client for an OpenAI-style chat completions endpoint
pub struct HttpCompletionClient {
    client: Client,
    config: CompletionConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

impl HttpCompletionClient {
    /// Create a client from completion configuration
    pub fn new(config: CompletionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    async fn request_once(
        &self,
        messages: &[PromptMessage],
        temperature: f32,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        let body = ChatRequest {
            model: &self.config.model,
            temperature,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key.trim());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                }
            } else {
                GenerationError::ApiError {
                    status: 0,
                    message: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError { status, message });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices returned".to_string()))
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionClient {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        temperature: Option<f32>,
    ) -> Result<String, GenerationError> {
        let temperature = temperature.unwrap_or(self.config.temperature);

        let mut last_error = None;
        for attempt in 1..=self.config.max_retries {
            match self.request_once(messages, temperature).await {
                Ok(text) => {
                    debug!("Completion succeeded on attempt {}", attempt);
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                    warn!(
                        "Completion attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, self.config.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => last_error = Some(e),
            }
        }

        Err(GenerationError::RetriesExhausted {
            attempts: self.config.max_retries,
            message: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}
