use agentloop::errors::{AgentError, ClientError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets the given configuration key,
/// e.g. `provider.api_key` -> `AGENTLOOP_PROVIDER__API_KEY`
pub fn to_env_var(field: &str) -> String {
    format!("AGENTLOOP_{}", field.replace('.', "__").to_uppercase())
}

/// Error body returned by every route: `{error, message, details}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, code: &'static str, message: S) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: json!({}),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        let (status, code) = match &err {
            ClientError::Authentication(_) => (StatusCode::UNAUTHORIZED, "mistral_auth_error"),
            ClientError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "mistral_rate_limit"),
            ClientError::Rejected { .. } => (StatusCode::BAD_REQUEST, "mistral_invalid_request"),
            ClientError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "mistral_timeout"),
            _ => (StatusCode::BAD_GATEWAY, "mistral_api_error"),
        };
        Self::new(status, code, err.to_string())
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Client(client) => client.into(),
            AgentError::InvalidRequest(message) | AgentError::InvalidParameters(message) => {
                Self::validation(message)
            }
            AgentError::ToolNotFound(name) => {
                Self::new(StatusCode::NOT_FOUND, "tool_not_found", "Tool not found")
                    .with_details(json!({ "tool": name }))
            }
            AgentError::ExecutionError(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "tool_execution_error",
                message,
            ),
            other => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_server_error",
                other.to_string(),
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %self.code, message = %self.message, "request_failed");
        }
        let body = json!({
            "error": self.code,
            "message": self.message,
            "details": self.details,
        });
        (self.status, Json(body)).into_response()
    }
}
