use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::base::{Completion, CompletionRequest, Provider};
use super::configs::MistralProviderConfig;
use super::utils::{messages_to_spec, response_to_completion, tools_to_spec};
use crate::errors::ClientError;

pub const MISTRAL_HOST: &str = "https://api.mistral.ai";

pub struct MistralProvider {
    client: Client,
    config: MistralProviderConfig,
}

impl MistralProvider {
    pub fn new(config: MistralProviderConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    fn build_payload(request: &CompletionRequest<'_>) -> Result<Value, ClientError> {
        let params = request.params;
        let mut payload = json!({
            "model": params.model,
            "messages": messages_to_spec(request.messages),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stream": false,
            "safe_prompt": params.safe_prompt,
        });

        let object = payload
            .as_object_mut()
            .ok_or_else(|| ClientError::Api("payload is not an object".into()))?;

        // Optional fields are left out rather than sent as null
        if let Some(top_p) = params.top_p {
            object.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(seed) = params.random_seed {
            object.insert("random_seed".to_string(), json!(seed));
        }
        if !request.tools.is_empty() {
            let tools = tools_to_spec(request.tools).map_err(|e| ClientError::Rejected {
                status: StatusCode::BAD_REQUEST.as_u16(),
                message: e.to_string(),
            })?;
            object.insert("tools".to_string(), json!(tools));
            if let Some(choice) = request.tool_choice {
                object.insert("tool_choice".to_string(), json!(choice.wire_value()));
            }
        }

        Ok(payload)
    }

    async fn post(&self, payload: &Value) -> Result<Value, ClientError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            return response
                .json()
                .await
                .map_err(|e| ClientError::MalformedResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClientError::Authentication(format!("{}: {}", status, body))
            }
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited(body),
            status if status.is_client_error() => ClientError::Rejected {
                status: status.as_u16(),
                message: body,
            },
            status => ClientError::Api(format!("{}: {}", status, body)),
        })
    }
}

#[async_trait]
impl Provider for MistralProvider {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ClientError> {
        let payload = Self::build_payload(&request)?;

        tracing::debug!(
            model = %request.params.model,
            messages_count = request.messages.len(),
            tools_count = request.tools.len(),
            "mistral_api_request"
        );

        let response = match self.post(&payload).await {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    ClientError::RateLimited(_) => {
                        tracing::warn!(error = %err, "mistral_rate_limit")
                    }
                    _ => tracing::error!(error = %err, "mistral_api_error"),
                }
                return Err(err);
            }
        };

        let completion = response_to_completion(&response)?;

        tracing::debug!(
            model = %completion.model,
            finish_reason = ?completion.finish_reason,
            total_tokens = completion.usage.total_tokens,
            "mistral_api_response"
        );

        Ok(completion)
    }
}
