use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::{AgentError, AgentResult, ClientError};
use crate::models::message::Message;
use crate::models::tool::{ToolCall, ToolChoice, ToolDescriptor, ToolExecutionResult};
use crate::providers::base::{Completion, CompletionRequest, GenerationParams, Provider, Usage};
use crate::tools::ToolRegistry;
use crate::transcript::Transcript;

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
pub const MAX_ITERATIONS_LIMIT: u32 = 50;
/// Tool calls beyond this count in a single model response are dropped
pub const MAX_TOOL_CALLS_PER_RESPONSE: usize = 10;
pub const MAX_TOOLS: usize = 64;
pub const MAX_MESSAGES: usize = 1000;
pub const MAX_CONTENT_LENGTH: usize = 32000;
pub const MAX_TOKENS_LIMIT: u32 = 32000;

/// A single completion with no tools
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub params: GenerationParams,
    pub model_timeout: Option<Duration>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            params: GenerationParams::default(),
            model_timeout: None,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> AgentResult<()> {
        validate_messages(&self.messages)?;
        validate_params(&self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

/// Everything one agent run needs
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    pub messages: Vec<Message>,
    /// Tools to advertise; None advertises every registered tool
    pub tools: Option<Vec<ToolDescriptor>>,
    pub tool_choice: ToolChoice,
    pub params: GenerationParams,
    pub max_iterations: u32,
    pub model_timeout: Option<Duration>,
}

impl AgentRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: None,
            tool_choice: ToolChoice::default(),
            params: GenerationParams::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model_timeout: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    /// Checks that do not depend on the registry
    pub fn validate(&self) -> AgentResult<()> {
        validate_messages(&self.messages)?;
        validate_params(&self.params)?;

        if !(1..=MAX_ITERATIONS_LIMIT).contains(&self.max_iterations) {
            return Err(AgentError::InvalidRequest(format!(
                "max_iterations must be between 1 and {}, got {}",
                MAX_ITERATIONS_LIMIT, self.max_iterations
            )));
        }
        Ok(())
    }
}

fn validate_messages(messages: &[Message]) -> AgentResult<()> {
    if messages.is_empty() {
        return Err(AgentError::InvalidRequest(
            "at least one message is required".into(),
        ));
    }
    if messages.len() > MAX_MESSAGES {
        return Err(AgentError::InvalidRequest(format!(
            "at most {} messages are allowed, got {}",
            MAX_MESSAGES,
            messages.len()
        )));
    }
    for (index, message) in messages.iter().enumerate() {
        let length = message.text().map_or(0, |t| t.chars().count());
        if length > MAX_CONTENT_LENGTH {
            return Err(AgentError::InvalidRequest(format!(
                "message {} exceeds {} characters",
                index, MAX_CONTENT_LENGTH
            )));
        }
    }
    Ok(())
}

fn validate_params(params: &GenerationParams) -> AgentResult<()> {
    if !(1..=MAX_TOKENS_LIMIT).contains(&params.max_tokens) {
        return Err(AgentError::InvalidRequest(format!(
            "max_tokens must be between 1 and {}, got {}",
            MAX_TOKENS_LIMIT, params.max_tokens
        )));
    }
    if !(0.0..=1.0).contains(&params.temperature) {
        return Err(AgentError::InvalidRequest(format!(
            "temperature must be between 0.0 and 1.0, got {}",
            params.temperature
        )));
    }
    if let Some(top_p) = params.top_p {
        if !(0.0..=1.0).contains(&top_p) {
            return Err(AgentError::InvalidRequest(format!(
                "top_p must be between 0.0 and 1.0, got {}",
                top_p
            )));
        }
    }
    Ok(())
}

fn validate_tool_set(tools: &[ToolDescriptor], tool_choice: ToolChoice) -> AgentResult<()> {
    if tools.len() > MAX_TOOLS {
        return Err(AgentError::InvalidRequest(format!(
            "at most {} tools may be advertised, got {}",
            MAX_TOOLS,
            tools.len()
        )));
    }
    if tool_choice == ToolChoice::Required && tools.is_empty() {
        return Err(AgentError::InvalidRequest(
            "tool_choice 'required' needs at least one tool".into(),
        ));
    }
    let mut names = HashSet::new();
    for tool in tools {
        tool.validate()
            .map_err(|e| AgentError::InvalidRequest(e.to_string()))?;
        if !names.insert(tool.name.as_str()) {
            return Err(AgentError::InvalidRequest(format!(
                "duplicate tool name '{}'",
                tool.name
            )));
        }
    }
    Ok(())
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    MaxIterationsReached,
    Cancelled,
    ContractViolation,
    TransportError,
    Timeout,
    MalformedResponse,
    AuthenticationError,
    RateLimited,
    Rejected,
    ApiError,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::MaxIterationsReached => "max_iterations_reached",
            FinishReason::Cancelled => "cancelled",
            FinishReason::ContractViolation => "contract_violation",
            FinishReason::TransportError => "transport_error",
            FinishReason::Timeout => "timeout",
            FinishReason::MalformedResponse => "malformed_response",
            FinishReason::AuthenticationError => "authentication_error",
            FinishReason::RateLimited => "rate_limited",
            FinishReason::Rejected => "rejected",
            FinishReason::ApiError => "api_error",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ClientError> for FinishReason {
    fn from(err: &ClientError) -> Self {
        match err {
            ClientError::Transport(_) => FinishReason::TransportError,
            ClientError::Timeout(_) => FinishReason::Timeout,
            ClientError::MalformedResponse(_) => FinishReason::MalformedResponse,
            ClientError::Authentication(_) => FinishReason::AuthenticationError,
            ClientError::RateLimited(_) => FinishReason::RateLimited,
            ClientError::Rejected { .. } => FinishReason::Rejected,
            ClientError::Api(_) => FinishReason::ApiError,
        }
    }
}

/// Final record of one run, built once when the loop terminates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRunResult {
    pub id: String,
    pub model: String,
    /// Present only when the run finished with `stop`
    pub content: Option<String>,
    pub finish_reason: FinishReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub usage: Usage,
    pub tool_calls_made: Vec<ToolExecutionResult>,
    pub iterations: u32,
    pub transcript: Transcript,
}

struct Outcome {
    finish_reason: FinishReason,
    content: Option<String>,
    error: Option<String>,
}

impl Outcome {
    fn finished(finish_reason: FinishReason) -> Self {
        Self {
            finish_reason,
            content: None,
            error: None,
        }
    }

    fn failed<E: ToString>(finish_reason: FinishReason, error: E) -> Self {
        Self {
            finish_reason,
            content: None,
            error: Some(error.to_string()),
        }
    }
}

enum LoopState {
    AwaitingModel,
    DispatchingTools(Vec<ToolCall>),
    Done(Outcome),
}

/// Mutable bookkeeping of a run in progress
struct RunProgress {
    transcript: Transcript,
    usage: Usage,
    tool_calls_made: Vec<ToolExecutionResult>,
    iterations: u32,
    last_id: Option<String>,
    model: String,
}

/// Resolves to None when the token fires before the future completes
async fn until_cancelled<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

/// Agent drives a conversation between a chat model and the registered tools
pub struct Agent {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>, registry: Arc<ToolRegistry>) -> Self {
        Self { provider, registry }
    }

    /// Descriptors of every registered tool, in registration order
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.registry.describe_all()
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    async fn call_model(
        &self,
        request: CompletionRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<Completion, ClientError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.complete(request))
                .await
                .map_err(|_| ClientError::Timeout(format!("model call exceeded {:?}", limit)))?,
            None => self.provider.complete(request).await,
        }
    }

    /// Plain completion without tools
    pub async fn chat(&self, request: ChatRequest) -> AgentResult<ChatResponse> {
        request.validate()?;

        let completion = self
            .call_model(
                CompletionRequest {
                    messages: &request.messages,
                    tools: &[],
                    tool_choice: None,
                    params: &request.params,
                },
                request.model_timeout,
            )
            .await?;

        Ok(ChatResponse {
            id: completion.id,
            model: if completion.model.is_empty() {
                request.params.model
            } else {
                completion.model
            },
            content: completion.content.unwrap_or_default(),
            finish_reason: completion.finish_reason,
            usage: completion.usage,
        })
    }

    pub async fn run(&self, request: AgentRequest) -> AgentResult<AgentRunResult> {
        self.run_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Run the agent loop until the model answers without tool calls, the
    /// iteration limit is hit, the chat client fails or `cancel` fires.
    ///
    /// Only request validation returns an error; every other way a run can end
    /// is reported through the result's finish reason.
    pub async fn run_with_cancellation(
        &self,
        request: AgentRequest,
        cancel: CancellationToken,
    ) -> AgentResult<AgentRunResult> {
        request.validate()?;
        let tools = match &request.tools {
            Some(tools) => tools.clone(),
            None => self.registry.describe_all(),
        };
        validate_tool_set(&tools, request.tool_choice)?;

        tracing::info!(
            model = %request.params.model,
            messages_count = request.messages.len(),
            tools_count = tools.len(),
            max_iterations = request.max_iterations,
            "agent_chat_start"
        );

        let mut progress = RunProgress {
            transcript: Transcript::new(request.messages.clone()),
            usage: Usage::default(),
            tool_calls_made: Vec::new(),
            iterations: 0,
            last_id: None,
            model: request.params.model.clone(),
        };

        let mut state = LoopState::AwaitingModel;
        let outcome = loop {
            state = match state {
                LoopState::AwaitingModel => {
                    self.await_model(&request, &tools, &mut progress, &cancel)
                        .await
                }
                LoopState::DispatchingTools(calls) => {
                    self.dispatch_tools(calls, &mut progress, &cancel).await
                }
                LoopState::Done(outcome) => break outcome,
            };
        };

        tracing::info!(
            iterations = progress.iterations,
            tool_calls = progress.tool_calls_made.len(),
            finish_reason = %outcome.finish_reason,
            total_tokens = progress.usage.total_tokens,
            "agent_chat_done"
        );

        Ok(AgentRunResult {
            id: progress
                .last_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            model: progress.model,
            content: outcome.content,
            finish_reason: outcome.finish_reason,
            error: outcome.error,
            usage: progress.usage,
            tool_calls_made: progress.tool_calls_made,
            iterations: progress.iterations,
            transcript: progress.transcript,
        })
    }

    async fn await_model(
        &self,
        request: &AgentRequest,
        tools: &[ToolDescriptor],
        progress: &mut RunProgress,
        cancel: &CancellationToken,
    ) -> LoopState {
        if cancel.is_cancelled() {
            return LoopState::Done(Outcome::finished(FinishReason::Cancelled));
        }
        if progress.iterations >= request.max_iterations {
            tracing::warn!(
                max_iterations = request.max_iterations,
                "agent_max_iterations_reached"
            );
            return LoopState::Done(Outcome::finished(FinishReason::MaxIterationsReached));
        }

        progress.iterations += 1;
        tracing::info!(iteration = progress.iterations, "agent_iteration");

        let completion_request = CompletionRequest {
            messages: progress.transcript.messages(),
            tools,
            tool_choice: Some(request.tool_choice),
            params: &request.params,
        };
        let call = self.call_model(completion_request, request.model_timeout);
        let Some(response) = until_cancelled(cancel, call).await else {
            return LoopState::Done(Outcome::finished(FinishReason::Cancelled));
        };

        let completion = match response {
            Ok(completion) => completion,
            Err(err) => {
                tracing::error!(error = %err, iteration = progress.iterations, "agent_model_error");
                return LoopState::Done(Outcome::failed(FinishReason::from(&err), err));
            }
        };

        progress.usage += completion.usage;
        if !completion.id.is_empty() {
            progress.last_id = Some(completion.id.clone());
        }
        if !completion.model.is_empty() {
            progress.model = completion.model.clone();
        }

        let Completion {
            content,
            mut tool_calls,
            ..
        } = completion;

        if tool_calls.is_empty() {
            let content = content.unwrap_or_default();
            progress
                .transcript
                .push(Message::assistant().with_text(content.clone()));
            return LoopState::Done(Outcome {
                finish_reason: FinishReason::Stop,
                content: Some(content),
                error: None,
            });
        }

        if tool_calls.len() > MAX_TOOL_CALLS_PER_RESPONSE {
            tracing::warn!(
                requested = tool_calls.len(),
                kept = MAX_TOOL_CALLS_PER_RESPONSE,
                "agent_tool_calls_truncated"
            );
            tool_calls.truncate(MAX_TOOL_CALLS_PER_RESPONSE);
        }

        let mut assistant = Message::assistant().with_tool_calls(tool_calls.clone());
        assistant.content = content.filter(|text| !text.is_empty());
        progress.transcript.push(assistant);

        LoopState::DispatchingTools(tool_calls)
    }

    async fn dispatch_tools(
        &self,
        calls: Vec<ToolCall>,
        progress: &mut RunProgress,
        cancel: &CancellationToken,
    ) -> LoopState {
        let batch = join_all(calls.iter().map(|call| self.registry.execute(call)));
        let Some(results) = until_cancelled(cancel, batch).await else {
            return LoopState::Done(Outcome::finished(FinishReason::Cancelled));
        };

        for result in results {
            progress.transcript.push(Message::tool(
                result.tool_call_id.clone(),
                result.name.clone(),
                result.model_content(),
            ));
            progress.tool_calls_made.push(result);
        }

        match progress.transcript.verify_tool_pairing() {
            Ok(()) => LoopState::AwaitingModel,
            Err(violation) => {
                tracing::error!(error = %violation, "agent_contract_violation");
                LoopState::Done(Outcome::failed(
                    FinishReason::ContractViolation,
                    violation,
                ))
            }
        }
    }
}
