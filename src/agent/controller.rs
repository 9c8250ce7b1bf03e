// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Agent controller
//!
//! Owns the provider handles for one node process and exposes the single
//! conversational operation: take history, run one turn through the graph,
//! return the assistant message. Handles are constructed once at startup
//! from `NodeConfig` and passed in; nothing here is a global.

use std::sync::Arc;

use tracing::info;

use crate::completion::{CompletionProvider, HttpCompletionClient};
use crate::config::NodeConfig;
use crate::embeddings::HttpEmbeddingClient;
use crate::retrieval::{HttpRerankerClient, Retriever};
use crate::search::SearchService;
use crate::vector::VectorStore;

use super::graph::Orchestrator;
use super::state::{ChatMessage, TurnState};

/// Controller running the conversational decision graph.
pub struct AgentController {
    orchestrator: Orchestrator,
    max_history: usize,
}

impl AgentController {
    /// Wire up the controller from configuration and a shared store.
    pub fn new(config: &NodeConfig, store: Arc<VectorStore>) -> Self {
        let embedder = Arc::new(HttpEmbeddingClient::new(config.embedding.clone()));
        let scorer = Arc::new(HttpRerankerClient::new(config.reranker.clone()));
        let completion: Arc<dyn CompletionProvider> =
            Arc::new(HttpCompletionClient::new(config.completion.clone()));
        let retriever = Arc::new(Retriever::new(
            embedder,
            scorer,
            store,
            config.retrieval.clone(),
        ));
        let search = Arc::new(SearchService::new(config.search.clone()));

        info!("AgentController initialized");
        Self {
            orchestrator: Orchestrator::new(completion, retriever, search),
            max_history: config.agent.max_history,
        }
    }

    /// Controller over pre-built components; the test seam.
    pub fn with_components(
        completion: Arc<dyn CompletionProvider>,
        retriever: Arc<Retriever>,
        search: Arc<SearchService>,
        max_history: usize,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(completion, retriever, search),
            max_history,
        }
    }

    /// Run one conversation turn and return the assistant's message.
    ///
    /// Never fails: every internal error degrades to an apologetic answer.
    pub async fn respond(&self, history: Vec<ChatMessage>) -> ChatMessage {
        if history.is_empty() {
            return ChatMessage::assistant("Please ask a question.");
        }

        let window = trim_history(history, self.max_history);
        let mut state = TurnState::new(window);

        let turn_id = uuid::Uuid::new_v4();
        info!("🚀 Turn {} for query: {:.50}", turn_id, state.query);
        self.orchestrator.run_turn(&mut state).await;

        // run_turn guarantees an answer on every path
        let answer = state.answer.unwrap_or_default();
        ChatMessage::assistant(answer)
    }
}

/// Keep only the most recent messages, bounded by the history window.
fn trim_history(mut history: Vec<ChatMessage>, max_history: usize) -> Vec<ChatMessage> {
    if history.len() > max_history {
        history.drain(..history.len() - max_history);
    }
    history
}
