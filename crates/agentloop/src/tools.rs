mod calculator;
mod current_time;
mod registry;
mod validation;

pub use calculator::CalculatorTool;
pub use current_time::CurrentTimeTool;
pub use registry::{create_default_registry, ToolRegistry};
pub use validation::validate_arguments;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AgentResult;
use crate::models::tool::ToolDescriptor;

/// A capability the model may ask the agent to execute on its behalf
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema advertised to the model
    fn descriptor(&self) -> &ToolDescriptor;

    /// Execute the tool. Arguments have already been checked against the
    /// descriptor's parameter schema.
    async fn call(&self, arguments: &Value) -> AgentResult<String>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}
