use crate::error::ApiError;
use crate::state::AppState;
use agentloop::providers::utils::tools_to_spec;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

async fn list_tools(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tools = tools_to_spec(&state.agent.tools())?;
    Ok(Json(json!({
        "count": tools.len(),
        "tools": tools,
    })))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .with_state(state)
}
