// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Axum server for the conversational entrypoint
//!
//! The chat handler never surfaces internal errors: the controller's
//! degradation policy guarantees an answer, worst case a generic apologetic
//! one, so the endpoint only fails on malformed requests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::agent::{AgentController, ChatMessage, Role};

use super::{ApiMessage, ChatRequest, ChatResponse, HealthResponse};

#[derive(Clone)]
struct AppState {
    agent: Arc<AgentController>,
}

/// Build the API router around an agent controller.
pub fn router(agent: Arc<AgentController>) -> Router {
    let state = AppState { agent };

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the API on the given port until the process exits.
pub async fn run_server(port: u16, agent: Arc<AgentController>) -> anyhow::Result<()> {
    let app = router(agent);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        agent_initialized: true,
    })
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    if request.messages.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let history: Vec<ChatMessage> = request.messages.iter().map(to_chat_message).collect();

    info!("💬 Processing chat request with {} messages", history.len());
    let reply = state.agent.respond(history).await;

    Ok(Json(ChatResponse {
        response: reply.content,
    }))
}

fn to_chat_message(message: &ApiMessage) -> ChatMessage {
    let role = if message.role.eq_ignore_ascii_case("user") {
        Role::User
    } else {
        Role::Assistant
    };
    ChatMessage {
        role,
        content: message.content.clone(),
    }
}
