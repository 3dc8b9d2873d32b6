use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use super::validation::validate_arguments;
use super::{CalculatorTool, CurrentTimeTool, Tool};
use crate::errors::{AgentError, AgentResult, RegistryError};
use crate::models::tool::{ToolCall, ToolDescriptor, ToolExecutionResult};

/// The set of tools available to the agent, dispatched by name.
///
/// Tools are kept in registration order so that the declarations sent to the
/// model are identical from one request to the next. Once built, a registry
/// is shared read-only between runs.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every tool execution; a call that runs longer is recorded as failed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a tool. The first registration of a name wins; registering the
    /// same name again is rejected and leaves the existing tool in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let descriptor = tool.descriptor();
        descriptor.validate()?;
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name.clone()));
        }
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Descriptors of every registered tool, in registration order
    pub fn describe_all(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor().clone()).collect()
    }

    /// Execute a tool call. Never fails: lookup, validation, handler errors,
    /// panics and timeouts all come back as an error-carrying result.
    pub async fn execute(&self, call: &ToolCall) -> ToolExecutionResult {
        tracing::debug!(tool_name = %call.name, tool_call_id = %call.id, "executing_tool");

        match self.dispatch(call).await {
            Ok(output) => ToolExecutionResult::success(call, output),
            Err(err) => {
                tracing::warn!(
                    tool_name = %call.name,
                    tool_call_id = %call.id,
                    error = %err,
                    "tool_execution_failed"
                );
                ToolExecutionResult::failure(call, err.to_string())
            }
        }
    }

    async fn dispatch(&self, call: &ToolCall) -> AgentResult<String> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        if let Some(error) = &call.argument_error {
            return Err(AgentError::InvalidParameters(error.clone()));
        }
        validate_arguments(tool.descriptor(), &call.arguments)?;

        let execution = AssertUnwindSafe(tool.call(&call.arguments)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, execution).await.map_err(|_| {
                AgentError::ExecutionError(format!(
                    "tool '{}' timed out after {:?}",
                    call.name, limit
                ))
            })?,
            None => execution.await,
        };

        outcome.unwrap_or_else(|_| {
            Err(AgentError::ExecutionError(format!(
                "tool '{}' panicked",
                call.name
            )))
        })
    }
}

/// A registry holding the built-in calculator and current time tools
pub fn create_default_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CurrentTimeTool::new()))?;
    registry.register(Arc::new(CalculatorTool::new()))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::{ParameterType, ToolParameter};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct EchoTool {
        descriptor: ToolDescriptor,
        reply: &'static str,
    }

    impl EchoTool {
        fn new(name: &str, reply: &'static str) -> Self {
            Self {
                descriptor: ToolDescriptor::new(name, "Echoes back the input").with_parameter(
                    ToolParameter::new("message", ParameterType::String).required(),
                ),
                reply,
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn call(&self, arguments: &Value) -> AgentResult<String> {
            let message = arguments["message"].as_str().unwrap_or_default();
            Ok(format!("{}{}", self.reply, message))
        }
    }

    struct SlowTool {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn call(&self, _arguments: &Value) -> AgentResult<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    struct PanickingTool {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl Tool for PanickingTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn call(&self, _arguments: &Value) -> AgentResult<String> {
            panic!("handler bug");
        }
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo", "first:"))).unwrap();

        let err = registry
            .register(Arc::new(EchoTool::new("echo", "second:")))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("echo".to_string()));
        assert_eq!(registry.len(), 1);

        let result = tokio_test::block_on(
            registry.execute(&ToolCall::new("1", "echo", json!({"message": "hi"}))),
        );
        assert_eq!(result.result.as_deref(), Some("first:hi"));
    }

    #[test]
    fn test_describe_all_is_stable() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(Arc::new(EchoTool::new(name, ""))).unwrap();
        }

        let first = registry.describe_all();
        let second = registry.describe_all();
        assert_eq!(first, second);
        let names: Vec<_> = first.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error_result() {
        let registry = ToolRegistry::new();
        let result = registry
            .execute(&ToolCall::new("1", "missing", json!({})))
            .await;
        assert!(result.result.is_none());
        assert_eq!(result.error.as_deref(), Some("Tool not found: missing"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_an_error_result() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo", ""))).unwrap();

        let result = registry.execute(&ToolCall::new("1", "echo", json!({}))).await;
        assert!(result
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Invalid parameters")));
    }

    #[tokio::test]
    async fn test_undecodable_arguments_are_an_error_result() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo", ""))).unwrap();

        let call = ToolCall::with_argument_error("1", "echo", "expected value at line 1");
        let result = registry.execute(&call).await;
        assert!(result.is_error());
        assert_eq!(result.arguments, json!({}));
    }

    #[tokio::test]
    async fn test_timeout_is_an_error_result() {
        let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(20));
        registry
            .register(Arc::new(SlowTool {
                descriptor: ToolDescriptor::new("slow", "never finishes in time"),
            }))
            .unwrap();

        let result = registry.execute(&ToolCall::new("1", "slow", json!({}))).await;
        assert!(result.error.as_deref().is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn test_panic_is_an_error_result() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(PanickingTool {
                descriptor: ToolDescriptor::new("boom", "always panics"),
            }))
            .unwrap();

        let result = registry.execute(&ToolCall::new("1", "boom", json!({}))).await;
        assert!(result.error.as_deref().is_some_and(|e| e.contains("panicked")));
    }

    #[test]
    fn test_default_registry() {
        let registry = create_default_registry().unwrap();
        let names: Vec<_> = registry
            .describe_all()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["get_current_time", "calculator"]);
    }
}
