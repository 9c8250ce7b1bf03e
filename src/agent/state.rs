// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turn state and decision types
//!
//! One `TurnState` exists per user turn. Nodes never write it directly;
//! they return a `StateDelta` and the orchestrator applies deltas in
//! sequence, so there is exactly one writer.

use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievalResult;

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Router output: the intent class of the latest user turn.
///
/// Closed set; the tolerant parser maps any model reply onto these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Answer directly from the conversation, no external knowledge
    DirectAnswer,
    /// Greeting / small talk
    Greeting,
    /// Needs a knowledge-base lookup
    NeedsKb,
}

impl RouteDecision {
    /// Parse a router model reply.
    ///
    /// Checks `needs_kb` before `greeting` and defaults to `direct_answer`,
    /// so a malformed reply still lands on a valid label.
    pub fn parse(reply: &str) -> Self {
        let reply = reply.trim().to_lowercase();
        if reply.contains("needs_kb") {
            RouteDecision::NeedsKb
        } else if reply.contains("greeting") {
            RouteDecision::Greeting
        } else {
            RouteDecision::DirectAnswer
        }
    }
}

/// Judge output: is the retrieved context sufficient to answer?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeDecision {
    Yes,
    No,
}

impl JudgeDecision {
    /// Parse a judge model reply; anything that is not a clear yes is no.
    pub fn parse(reply: &str) -> Self {
        if reply.trim().to_lowercase().contains("yes") {
            JudgeDecision::Yes
        } else {
            JudgeDecision::No
        }
    }
}

/// Phases of one turn through the decision graph.
///
/// Every transition strictly advances toward `Done`; a turn can never
/// re-enter `Routing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Routing,
    /// Direct / greeting path: answer with empty context
    Direct,
    Retrieving,
    Judging,
    FallbackSearching,
    Generating,
    Done,
}

/// State carried through one turn of the graph.
#[derive(Debug, Default)]
pub struct TurnState {
    /// Conversation history including the latest user message
    pub messages: Vec<ChatMessage>,
    /// The latest user question
    pub query: String,
    /// Chunks retrieved from the knowledge base this turn
    pub retrieved: Vec<RetrievalResult>,
    /// Resolved generation context (knowledge base or web), if any
    pub context: Option<String>,
    /// Router decision, once made
    pub route_decision: Option<RouteDecision>,
    /// Judge decision, once made
    pub judge_decision: Option<JudgeDecision>,
    /// Final answer, populated when the turn reaches `Done`
    pub answer: Option<String>,
}

impl TurnState {
    /// Start a turn from conversation history.
    ///
    /// The query is the content of the last user message.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        let query = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Self {
            messages,
            query,
            ..Default::default()
        }
    }

    /// Apply a node's delta. Only the orchestrator calls this.
    pub fn apply(&mut self, delta: StateDelta) {
        if let Some(route) = delta.route_decision {
            self.route_decision = Some(route);
        }
        if let Some(retrieved) = delta.retrieved {
            self.retrieved = retrieved;
        }
        if let Some(context) = delta.context {
            self.context = Some(context);
        }
        if let Some(judge) = delta.judge_decision {
            self.judge_decision = Some(judge);
        }
        if let Some(answer) = delta.answer {
            self.answer = Some(answer);
        }
    }

    /// Context string for prompting, empty when none was resolved
    pub fn context_text(&self) -> &str {
        self.context.as_deref().unwrap_or("")
    }
}

/// Typed state update returned by a graph node.
#[derive(Debug, Default)]
pub struct StateDelta {
    pub route_decision: Option<RouteDecision>,
    pub retrieved: Option<Vec<RetrievalResult>>,
    pub context: Option<String>,
    pub judge_decision: Option<JudgeDecision>,
    pub answer: Option<String>,
}
