// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turn orchestrator
//!
//! Drives one user turn through the decision graph:
//!
//! ```text
//! Routing -> Direct ----------------------------------------> Done
//!         -> Retrieving -> Judging -> Generating -----------> Done
//!                                  -> FallbackSearching -> Generating -> Done
//! ```
//!
//! The orchestrator owns the authoritative `TurnState`. Each node reads the
//! state, performs its work against external services, and returns a
//! `StateDelta`; deltas are applied strictly in sequence. Transitions only
//! move forward, so a turn always terminates with `answer` populated.
//!
//! Failure policy: node-level failures degrade, they never abort the turn.
//! A failed router call falls back to the direct path, a failed judge call
//! is treated as insufficient context, a failed web search leaves whatever
//! context retrieval produced, and a failed generation yields the canned
//! degraded reply.

use std::sync::Arc;

use tracing::{info, warn};

use crate::completion::{CompletionProvider, PromptMessage};
use crate::retrieval::Retriever;
use crate::search::SearchService;

use super::prompts;
use super::state::{ChatMessage, JudgeDecision, Role, RouteDecision, StateDelta, TurnPhase, TurnState};

/// Decision-graph executor for one conversation turn.
pub struct Orchestrator {
    completion: Arc<dyn CompletionProvider>,
    retriever: Arc<Retriever>,
    search: Arc<SearchService>,
}

impl Orchestrator {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        retriever: Arc<Retriever>,
        search: Arc<SearchService>,
    ) -> Self {
        Self {
            completion,
            retriever,
            search,
        }
    }

    /// Run a turn to completion. `state.answer` is set when this returns.
    pub async fn run_turn(&self, state: &mut TurnState) {
        let mut phase = TurnPhase::Routing;
        while phase != TurnPhase::Done {
            phase = self.step(phase, state).await;
        }
        if state.answer.is_none() {
            // Terminal safety net; nodes populate the answer on every path
            state.answer = Some(prompts::DEGRADED_REPLY.to_string());
        }
    }

    /// Execute one node and return the next phase.
    async fn step(&self, phase: TurnPhase, state: &mut TurnState) -> TurnPhase {
        match phase {
            TurnPhase::Routing => {
                let delta = self.route_node(state).await;
                state.apply(delta);
                match state.route_decision {
                    Some(RouteDecision::NeedsKb) => TurnPhase::Retrieving,
                    _ => TurnPhase::Direct,
                }
            }
            TurnPhase::Direct => {
                let delta = self.direct_node(state).await;
                state.apply(delta);
                TurnPhase::Done
            }
            TurnPhase::Retrieving => {
                let delta = self.retrieve_node(state).await;
                state.apply(delta);
                TurnPhase::Judging
            }
            TurnPhase::Judging => {
                let delta = self.judge_node(state).await;
                state.apply(delta);
                match state.judge_decision {
                    Some(JudgeDecision::Yes) => TurnPhase::Generating,
                    _ => TurnPhase::FallbackSearching,
                }
            }
            TurnPhase::FallbackSearching => {
                let delta = self.web_search_node(state).await;
                state.apply(delta);
                TurnPhase::Generating
            }
            TurnPhase::Generating => {
                let delta = self.answer_node(state).await;
                state.apply(delta);
                TurnPhase::Done
            }
            TurnPhase::Done => TurnPhase::Done,
        }
    }

    /// Classify the intent of the latest user turn.
    async fn route_node(&self, state: &TurnState) -> StateDelta {
        info!("🧭 Routing query: {:.50}", state.query);

        let messages = [
            PromptMessage::system(prompts::ROUTER_PROMPT),
            PromptMessage::user(&state.query),
        ];

        let decision = match self.completion.complete(&messages, Some(0.0)).await {
            Ok(reply) => RouteDecision::parse(&reply),
            Err(e) => {
                warn!("Router call failed ({}), taking direct path", e);
                RouteDecision::DirectAnswer
            }
        };

        info!("🧭 Router decision: {:?}", decision);
        StateDelta {
            route_decision: Some(decision),
            ..Default::default()
        }
    }

    /// Knowledge-base lookup.
    async fn retrieve_node(&self, state: &TurnState) -> StateDelta {
        info!("📚 Searching knowledge base...");

        let retrieved = self.retriever.retrieve(&state.query).await;
        let context = if retrieved.is_empty() {
            None
        } else {
            Some(
                retrieved
                    .iter()
                    .map(|r| r.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            )
        };

        StateDelta {
            retrieved: Some(retrieved),
            context,
            ..Default::default()
        }
    }

    /// Decide whether retrieved context suffices to answer.
    async fn judge_node(&self, state: &TurnState) -> StateDelta {
        let context = state.context_text();
        if context.is_empty() {
            info!("⚖️ No context found in KB. Judging: insufficient.");
            return StateDelta {
                judge_decision: Some(JudgeDecision::No),
                ..Default::default()
            };
        }

        info!("⚖️ Judging context sufficiency...");
        let messages = [PromptMessage::user(prompts::judge_prompt(
            context,
            &state.query,
        ))];

        let decision = match self.completion.complete(&messages, Some(0.0)).await {
            Ok(reply) => JudgeDecision::parse(&reply),
            Err(e) => {
                warn!("Judge call failed ({}), treating context as insufficient", e);
                JudgeDecision::No
            }
        };

        info!("⚖️ Judge decision: {:?}", decision);
        StateDelta {
            judge_decision: Some(decision),
            ..Default::default()
        }
    }

    /// Web search fallback; failures keep whatever context exists.
    async fn web_search_node(&self, state: &TurnState) -> StateDelta {
        info!("🌐 Searching web...");

        match self.search.search(&state.query, None).await {
            Ok(response) if !response.results.is_empty() => StateDelta {
                context: Some(response.to_context()),
                ..Default::default()
            },
            Ok(_) => {
                warn!("Web search returned no results, keeping existing context");
                StateDelta::default()
            }
            Err(e) => {
                warn!("Web search failed ({}), keeping existing context", e);
                StateDelta::default()
            }
        }
    }

    /// Answer directly, without knowledge context.
    ///
    /// Greetings get a canned reply with no model call.
    async fn direct_node(&self, state: &TurnState) -> StateDelta {
        if state.route_decision == Some(RouteDecision::Greeting) {
            info!("👋 Generating greeting...");
            return StateDelta {
                answer: Some(prompts::GREETING_REPLY.to_string()),
                ..Default::default()
            };
        }

        info!("✍️ Generating direct answer...");
        let messages = history_messages(&state.messages);
        let answer = match self.completion.complete(&messages, None).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Direct answer generation failed: {}", e);
                prompts::DEGRADED_REPLY.to_string()
            }
        };

        StateDelta {
            answer: Some(answer),
            ..Default::default()
        }
    }

    /// Generate the final grounded answer from resolved context.
    async fn answer_node(&self, state: &TurnState) -> StateDelta {
        info!("✍️ Generating answer...");

        let context = state.context_text();
        let answer = if context.is_empty() {
            // Nothing resolved on the knowledge path either; answer from
            // the conversation without fabricating citations.
            match self.completion.complete(&history_messages(&state.messages), None).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Answer generation failed: {}", e);
                    prompts::DEGRADED_REPLY.to_string()
                }
            }
        } else {
            let mut messages = vec![PromptMessage::system(prompts::SYSTEM_PROMPT)];
            // Prior turns keep multi-turn coherence; the latest user turn is
            // replaced by the contextualized prompt.
            messages.extend(prior_turns(&state.messages));
            messages.push(PromptMessage::user(prompts::answer_prompt(
                context,
                &state.query,
            )));

            match self.completion.complete(&messages, None).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Answer generation failed: {}", e);
                    prompts::DEGRADED_REPLY.to_string()
                }
            }
        };

        StateDelta {
            answer: Some(answer),
            ..Default::default()
        }
    }
}

/// Map the whole conversation to completion messages.
fn history_messages(messages: &[ChatMessage]) -> Vec<PromptMessage> {
    messages
        .iter()
        .map(|m| match m.role {
            Role::User => PromptMessage::user(&m.content),
            Role::Assistant => PromptMessage::assistant(&m.content),
        })
        .collect()
}

/// All turns before the latest user message.
fn prior_turns(messages: &[ChatMessage]) -> Vec<PromptMessage> {
    let mut mapped = history_messages(messages);
    mapped.pop();
    mapped
}
