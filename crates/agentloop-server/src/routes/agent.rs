use crate::error::ApiError;
use crate::routes::messages::{convert_messages, IncomingMessage};
use crate::state::AppState;
use agentloop::agent::{AgentRequest, FinishReason, DEFAULT_MAX_ITERATIONS};
use agentloop::models::tool::{ToolChoice, ToolExecutionResult};
use agentloop::providers::base::{GenerationParams, Usage};
use agentloop::providers::utils::tool_from_spec;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accepts both `"auto"` and `{"type": "auto"}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IncomingToolChoice {
    Strategy(ToolChoice),
    Object {
        #[serde(rename = "type")]
        kind: ToolChoice,
    },
}

impl From<IncomingToolChoice> for ToolChoice {
    fn from(choice: IncomingToolChoice) -> Self {
        match choice {
            IncomingToolChoice::Strategy(kind) | IncomingToolChoice::Object { kind } => kind,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentPayload {
    messages: Vec<IncomingMessage>,
    #[serde(default)]
    model: Option<String>,
    /// Empty means the built-in tools
    #[serde(default)]
    tools: Vec<Value>,
    #[serde(default)]
    tool_choice: Option<IncomingToolChoice>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_iterations: Option<u32>,
}

impl AgentPayload {
    fn into_request(self, default_model: &str) -> Result<AgentRequest, ApiError> {
        let defaults = GenerationParams::default();
        let params = GenerationParams {
            model: self.model.unwrap_or_else(|| default_model.to_string()),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            ..defaults
        };

        let mut request = AgentRequest::new(convert_messages(self.messages)?)
            .with_params(params)
            .with_tool_choice(self.tool_choice.map(ToolChoice::from).unwrap_or_default())
            .with_max_iterations(self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS));

        if !self.tools.is_empty() {
            let tools = self
                .tools
                .iter()
                .map(tool_from_spec)
                .collect::<Result<Vec<_>, _>>()?;
            request = request.with_tools(tools);
        }

        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    id: String,
    model: String,
    content: String,
    finish_reason: FinishReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    usage: Usage,
    tool_calls_made: Vec<ToolExecutionResult>,
    iterations: u32,
}

async fn handler(
    State(state): State<AppState>,
    payload: Result<Json<AgentPayload>, JsonRejection>,
) -> Result<Json<AgentResponse>, ApiError> {
    let Json(payload) = payload?;
    let request = payload.into_request(&state.default_model)?;

    let result = state
        .agent
        .run_with_cancellation(request, state.shutdown.child_token())
        .await?;

    Ok(Json(AgentResponse {
        id: result.id,
        model: result.model,
        content: result.content.unwrap_or_default(),
        finish_reason: result.finish_reason,
        error: result.error,
        usage: result.usage,
        tool_calls_made: result.tool_calls_made,
        iterations: result.iterations,
    }))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/agent", post(handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, post_json, send, text};
    use agentloop::models::tool::ToolCall;
    use agentloop::providers::base::{Completion, Usage};
    use axum::http::StatusCode;
    use serde_json::json;

    fn calculator_call() -> Completion {
        Completion {
            id: "cmpl-1".to_string(),
            model: "mistral-small-latest".to_string(),
            content: None,
            tool_calls: vec![ToolCall::new(
                "call_1",
                "calculator",
                json!({"operation": "multiply", "a": 25, "b": 17}),
            )],
            finish_reason: Some("tool_calls".to_string()),
            usage: Usage::new(20, 10, 30),
        }
    }

    #[tokio::test]
    async fn test_agent_runs_tools() {
        let app = app(vec![
            Ok(calculator_call()),
            Ok(text("cmpl-2", "25 * 17 = 425")),
        ]);

        let (status, body) = send(
            app,
            post_json(
                "/agent",
                json!({
                    "messages": [{"role": "user", "content": "What is 25 * 17?"}],
                    "tool_choice": {"type": "auto"}
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "cmpl-2");
        assert_eq!(body["content"], "25 * 17 = 425");
        assert_eq!(body["finish_reason"], "stop");
        assert_eq!(body["iterations"], 2);
        assert_eq!(body["usage"]["total_tokens"], 42);
        assert_eq!(body["tool_calls_made"][0]["tool_call_id"], "call_1");
        assert_eq!(body["tool_calls_made"][0]["result"], "425");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_agent_reports_iteration_limit() {
        let app = app(vec![Ok(calculator_call()), Ok(calculator_call())]);

        let (status, body) = send(
            app,
            post_json(
                "/agent",
                json!({
                    "messages": [{"role": "user", "content": "Keep going"}],
                    "max_iterations": 2,
                    "tool_choice": "any"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["finish_reason"], "max_iterations_reached");
        assert_eq!(body["iterations"], 2);
        assert_eq!(body["content"], "");
    }

    #[tokio::test]
    async fn test_agent_rejects_zero_iterations() {
        let (status, body) = send(
            app(vec![]),
            post_json(
                "/agent",
                json!({
                    "messages": [{"role": "user", "content": "hi"}],
                    "max_iterations": 0
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_agent_rejects_invalid_tool_spec() {
        let (status, _) = send(
            app(vec![]),
            post_json(
                "/agent",
                json!({
                    "messages": [{"role": "user", "content": "hi"}],
                    "tools": [{"type": "function"}]
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
