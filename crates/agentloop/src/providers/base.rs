use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

use crate::errors::ClientError;
use crate::models::message::Message;
use crate::models::tool::{ToolCall, ToolChoice, ToolDescriptor};

pub const DEFAULT_MODEL: &str = "mistral-small-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// Sampling parameters for one model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub safe_prompt: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: None,
            random_seed: None,
            safe_prompt: false,
        }
    }
}

/// Everything the chat client needs for one model call
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDescriptor],
    /// None leaves the strategy to the provider's default
    pub tool_choice: Option<ToolChoice>,
    pub params: &'a GenerationParams,
}

/// What the model answered: either final content or a batch of tool calls
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub id: String,
    pub model: String,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

impl Completion {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Base trait for chat completion providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant turn for the given transcript
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_accumulates() {
        let mut usage = Usage::default();
        usage += Usage::new(10, 20, 30);
        usage += Usage::new(1, 2, 3);
        assert_eq!(usage, Usage::new(11, 22, 33));
    }

    #[test]
    fn test_usage_accumulation_saturates() {
        let mut usage = Usage::new(u32::MAX - 1, 5, u32::MAX);
        usage += Usage::new(10, 5, 1);
        assert_eq!(usage, Usage::new(u32::MAX, 10, u32::MAX));
    }

    #[test]
    fn test_usage_serialization() {
        let value = serde_json::to_value(Usage::new(10, 20, 30)).unwrap();
        assert_eq!(
            value,
            json!({"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30})
        );
    }

    #[test]
    fn test_generation_defaults() {
        let params = GenerationParams::default();
        assert_eq!(params.model, "mistral-small-latest");
        assert_eq!(params.max_tokens, 1024);
        assert_eq!(params.temperature, 0.7);
    }
}
