use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::RegistryError;

pub const MAX_TOOL_NAME_LENGTH: usize = 64;
pub const MAX_TOOL_DESCRIPTION_LENGTH: usize = 1024;

/// JSON schema type of a single tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Integer => "integer",
            ParameterType::Boolean => "boolean",
            ParameterType::Object => "object",
            ParameterType::Array => "array",
        }
    }

    /// Whether a decoded JSON value plausibly has this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterType::String => value.is_string(),
            ParameterType::Number => value.is_number(),
            ParameterType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|v| v.fract() == 0.0)
            }
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Object => value.is_object(),
            ParameterType::Array => value.is_array(),
        }
    }
}

/// A single named parameter a tool accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
}

impl ToolParameter {
    pub fn new<S: Into<String>>(name: S, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            allowed_values: None,
            required: false,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Describes a tool to the model: its name, what it does, and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    pub fn new<N, D>(name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Check the limits the remote API enforces on tool declarations
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.is_empty() || self.name.chars().count() > MAX_TOOL_NAME_LENGTH {
            return Err(RegistryError::InvalidDescriptor(format!(
                "tool name '{}' must be between 1 and {} characters",
                self.name, MAX_TOOL_NAME_LENGTH
            )));
        }
        if self.description.chars().count() > MAX_TOOL_DESCRIPTION_LENGTH {
            return Err(RegistryError::InvalidDescriptor(format!(
                "description of '{}' exceeds {} characters",
                self.name, MAX_TOOL_DESCRIPTION_LENGTH
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for parameter in &self.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(RegistryError::InvalidDescriptor(format!(
                    "duplicate parameter '{}' in tool '{}'",
                    parameter.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// A single request from the model to execute one named tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    /// Set when the model produced arguments that could not be decoded; the
    /// call is still answered, with an error result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_error: Option<String>,
}

impl ToolCall {
    pub fn new<I, N>(id: I, name: N, arguments: Value) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            argument_error: None,
        }
    }

    pub fn with_argument_error<I, N, E>(id: I, name: N, error: E) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        E: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: Value::Object(Map::new()),
            argument_error: Some(error.into()),
        }
    }
}

/// Per-run policy controlling whether the model must, may, or cannot use tools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
    #[serde(alias = "any")]
    Required,
    None,
}

impl ToolChoice {
    /// The token mistral expects for this strategy
    pub fn wire_value(&self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
            ToolChoice::Required => "any",
            ToolChoice::None => "none",
        }
    }
}

/// Outcome of one tool invocation, folded into the run's tool call log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub tool_call_id: String,
    pub name: String,
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecutionResult {
    pub fn success<S: Into<String>>(call: &ToolCall, result: S) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn failure<S: Into<String>>(call: &ToolCall, error: S) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Text handed back to the model in the `tool` message
    pub fn model_content(&self) -> String {
        match (&self.result, &self.error) {
            (_, Some(error)) => format!("Error: {}", error),
            (Some(result), None) => result.clone(),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert!(ParameterType::Integer.accepts(&json!(3)));
        assert!(ParameterType::Integer.accepts(&json!(3.0)));
        assert!(!ParameterType::Integer.accepts(&json!(3.5)));
        assert!(!ParameterType::Integer.accepts(&json!("3")));
    }

    #[test]
    fn test_tool_choice_accepts_any_alias() {
        let choice: ToolChoice = serde_json::from_value(json!("any")).unwrap();
        assert_eq!(choice, ToolChoice::Required);
        assert_eq!(choice.wire_value(), "any");
        assert_eq!(ToolChoice::default(), ToolChoice::Auto);
    }

    #[test]
    fn test_descriptor_rejects_long_name() {
        let descriptor = ToolDescriptor::new("x".repeat(65), "too long");
        assert!(matches!(
            descriptor.validate(),
            Err(RegistryError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_descriptor_rejects_duplicate_parameter() {
        let descriptor = ToolDescriptor::new("dup", "duplicate parameters")
            .with_parameter(ToolParameter::new("a", ParameterType::Number))
            .with_parameter(ToolParameter::new("a", ParameterType::String));
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_model_content_prefers_error() {
        let call = ToolCall::new("1", "calculator", json!({}));
        assert_eq!(
            ToolExecutionResult::failure(&call, "boom").model_content(),
            "Error: boom"
        );
        assert_eq!(
            ToolExecutionResult::success(&call, "42").model_content(),
            "42"
        );
    }
}
