use crate::error::ApiError;
use crate::routes::messages::{convert_messages, IncomingMessage};
use crate::state::AppState;
use agentloop::agent::{ChatRequest, ChatResponse};
use agentloop::providers::base::GenerationParams;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    messages: Vec<IncomingMessage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    top_p: Option<f32>,
    #[serde(default)]
    random_seed: Option<u64>,
    #[serde(default)]
    safe_prompt: bool,
}

impl ChatPayload {
    fn into_request(self, default_model: &str) -> Result<ChatRequest, ApiError> {
        let defaults = GenerationParams::default();
        let params = GenerationParams {
            model: self.model.unwrap_or_else(|| default_model.to_string()),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p,
            random_seed: self.random_seed,
            safe_prompt: self.safe_prompt,
        };
        Ok(ChatRequest::new(convert_messages(self.messages)?).with_params(params))
    }
}

async fn handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload?;
    let request = payload.into_request(&state.default_model)?;

    let response = state.agent.chat(request).await?;
    Ok(Json(response))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handler))
        .with_state(state)
}
