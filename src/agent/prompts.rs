// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prompts for the agent's decision and generation nodes

/// System prompt for grounded answer generation
pub const SYSTEM_PROMPT: &str = "You are a helpful WordPress QA assistant. Your role is to answer questions about WordPress using the provided context from documentation and community discussions.

Guidelines:
- Answer based on the provided context
- If the context doesn't contain enough information, say so honestly
- Be concise but thorough
- Use technical terms when appropriate
- If you're unsure, acknowledge uncertainty
- Format code snippets with markdown code blocks
";

/// System prompt for the router node
pub const ROUTER_PROMPT: &str = "You are an expert router. Your task is to route the user's query to one of three paths:
1. \"direct_answer\": For simple questions that don't need external knowledge (e.g., \"What is 2+2?\", \"Who are you?\").
2. \"greeting\": For greetings and small talk (e.g., \"Hi\", \"Hello\", \"How are you?\").
3. \"needs_kb\": For questions about WordPress, technical issues, or anything that might require looking up information.

Return ONLY the classification string: \"direct_answer\", \"greeting\", or \"needs_kb\".
";

/// Canned reply for the greeting path; no model call is made
pub const GREETING_REPLY: &str = "Hello! How can I help you with WordPress today?";

/// Degraded reply when generation fails after retries.
///
/// The conversational entrypoint must never surface a raw internal error.
pub const DEGRADED_REPLY: &str = "I'm sorry, I couldn't reach my knowledge sources to answer that right now. Context for this question is unavailable, so please try again in a moment.";

/// Build the judge prompt for a context/question pair
pub fn judge_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a judge. Your task is to evaluate if the provided context is sufficient to answer the user's question.

Context:
{context}

Question: {question}

Return \"yes\" if the context is sufficient to answer the question.
Return \"no\" if the context is NOT sufficient or irrelevant.
Return ONLY \"yes\" or \"no\".
"
    )
}

/// Build the grounded answer prompt for a context/question pair
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Context:
{context}

Question: {question}

Answer the question based on the context provided."
    )
}
