use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::errors::ClientError;
use crate::models::message::Message;
use crate::models::tool::ToolChoice;
use crate::providers::base::{Completion, CompletionRequest, Provider, Usage};

/// What the mock saw on one call
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub tool_choice: Option<ToolChoice>,
    pub model: String,
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Result<Completion, ClientError>>>>,
    repeat: Option<Completion>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Result<Completion, ClientError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            repeat: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider that answers every call with the same completion
    pub fn repeating(completion: Completion) -> Self {
        Self {
            repeat: Some(completion),
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ClientError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
            tool_choice: request.tool_choice,
            model: request.params.model.clone(),
        });

        if let Some(completion) = &self.repeat {
            return Ok(completion.clone());
        }

        let mut responses = self.responses.lock().unwrap();
        match responses.pop_front() {
            Some(response) => response,
            // Return empty response if no more pre-configured responses
            None => Ok(Completion {
                content: Some(String::new()),
                finish_reason: Some("stop".to_string()),
                usage: Usage::default(),
                ..Completion::default()
            }),
        }
    }
}
