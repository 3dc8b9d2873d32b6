use async_trait::async_trait;
use serde_json::Value;

use super::Tool;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{ParameterType, ToolDescriptor, ToolParameter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    const ALL: [&'static str; 4] = ["add", "subtract", "multiply", "divide"];

    fn parse(token: &str) -> AgentResult<Self> {
        match token {
            "add" => Ok(Operation::Add),
            "subtract" => Ok(Operation::Subtract),
            "multiply" => Ok(Operation::Multiply),
            "divide" => Ok(Operation::Divide),
            other => Err(AgentError::InvalidParameters(format!(
                "unknown operation '{}'",
                other
            ))),
        }
    }

    fn apply(self, a: f64, b: f64) -> AgentResult<f64> {
        match self {
            Operation::Add => Ok(a + b),
            Operation::Subtract => Ok(a - b),
            Operation::Multiply => Ok(a * b),
            Operation::Divide if b == 0.0 => {
                Err(AgentError::ExecutionError("division by zero".to_string()))
            }
            Operation::Divide => Ok(a / b),
        }
    }
}

/// Basic arithmetic on two operands
pub struct CalculatorTool {
    descriptor: ToolDescriptor,
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

impl CalculatorTool {
    pub const NAME: &'static str = "calculator";

    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            Self::NAME,
            "Perform basic arithmetic operations (add, subtract, multiply, divide)",
        )
        .with_parameter(
            ToolParameter::new("operation", ParameterType::String)
                .with_description("The operation to perform")
                .with_allowed_values(Operation::ALL)
                .required(),
        )
        .with_parameter(
            ToolParameter::new("a", ParameterType::Number)
                .with_description("First operand")
                .required(),
        )
        .with_parameter(
            ToolParameter::new("b", ParameterType::Number)
                .with_description("Second operand")
                .required(),
        );

        Self { descriptor }
    }
}

fn operand(arguments: &Value, name: &str) -> AgentResult<f64> {
    arguments
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| AgentError::InvalidParameters(format!("'{}' must be a number", name)))
}

/// Whole results print without a fractional part, so 25 * 17 reads as 425
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn call(&self, arguments: &Value) -> AgentResult<String> {
        let operation = arguments
            .get("operation")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::InvalidParameters("'operation' is required".into()))
            .and_then(Operation::parse)?;
        let a = operand(arguments, "a")?;
        let b = operand(arguments, "b")?;

        operation.apply(a, b).map(format_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn calculate(arguments: Value) -> AgentResult<String> {
        CalculatorTool::new().call(&arguments).await
    }

    #[tokio::test]
    async fn test_multiply() {
        let result = calculate(json!({"operation": "multiply", "a": 25, "b": 17})).await;
        assert_eq!(result.unwrap(), "425");
    }

    #[tokio::test]
    async fn test_fractional_results() {
        let result = calculate(json!({"operation": "divide", "a": 1, "b": 4})).await;
        assert_eq!(result.unwrap(), "0.25");
        let result = calculate(json!({"operation": "subtract", "a": 1.5, "b": 4})).await;
        assert_eq!(result.unwrap(), "-2.5");
    }

    #[tokio::test]
    async fn test_divide_by_zero() {
        let err = calculate(json!({"operation": "divide", "a": 10, "b": 0}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AgentError::ExecutionError("division by zero".to_string())
        );
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let err = calculate(json!({"operation": "pow", "a": 2, "b": 3}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(425.0), "425");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }
}
