use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};

use super::base::{Completion, Usage};
use crate::errors::{AgentError, AgentResult, ClientError};
use crate::models::message::Message;
use crate::models::tool::{ParameterType, ToolCall, ToolDescriptor, ToolParameter};

lazy_static! {
    static ref FUNCTION_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex");
}

pub fn is_valid_function_name(name: &str) -> bool {
    FUNCTION_NAME.is_match(name)
}

/// Convert internal messages to the chat completions message specification
pub fn messages_to_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut converted = Map::new();
            converted.insert("role".to_string(), json!(message.role));
            converted.insert(
                "content".to_string(),
                json!(message.content.clone().unwrap_or_default()),
            );
            if let Some(id) = &message.tool_call_id {
                converted.insert("tool_call_id".to_string(), json!(id));
            }
            if let Some(name) = &message.name {
                converted.insert("name".to_string(), json!(name));
            }
            if message.has_tool_calls() {
                let calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                converted.insert("tool_calls".to_string(), Value::Array(calls));
            }
            Value::Object(converted)
        })
        .collect()
}

/// Convert one descriptor to the function tool specification. Optional
/// fields that are not set are left out entirely rather than sent as null.
pub fn tool_to_spec(tool: &ToolDescriptor) -> Value {
    let mut properties = Map::new();
    for parameter in &tool.parameters {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(parameter.kind.as_str()));
        if let Some(description) = &parameter.description {
            property.insert("description".to_string(), json!(description));
        }
        if let Some(values) = &parameter.allowed_values {
            property.insert("enum".to_string(), json!(values));
        }
        properties.insert(parameter.name.clone(), Value::Object(property));
    }

    let required: Vec<&str> = tool
        .required_parameters()
        .map(|p| p.name.as_str())
        .collect();

    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        }
    })
}

/// Convert internal tool descriptors to the function tool specification
pub fn tools_to_spec(tools: &[ToolDescriptor]) -> AgentResult<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::with_capacity(tools.len());

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(AgentError::InvalidRequest(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }
        result.push(tool_to_spec(tool));
    }

    Ok(result)
}

/// Parse a function tool specification back into a descriptor
pub fn tool_from_spec(spec: &Value) -> AgentResult<ToolDescriptor> {
    let function = spec
        .get("function")
        .ok_or_else(|| AgentError::InvalidRequest("tool is missing 'function'".into()))?;
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidRequest("tool function is missing 'name'".into()))?;
    let description = function
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut descriptor = ToolDescriptor::new(name, description);
    let parameters = function.get("parameters").unwrap_or(&Value::Null);
    let required: Vec<&str> = parameters
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if let Some(properties) = parameters.get("properties").and_then(Value::as_object) {
        for (param_name, property) in properties {
            let kind: ParameterType = property
                .get("type")
                .cloned()
                .map(serde_json::from_value::<ParameterType>)
                .transpose()
                .map_err(|e| {
                    AgentError::InvalidRequest(format!(
                        "parameter '{}' of tool '{}' has an unsupported type: {}",
                        param_name, name, e
                    ))
                })?
                .ok_or_else(|| {
                    AgentError::InvalidRequest(format!(
                        "parameter '{}' of tool '{}' is missing 'type'",
                        param_name, name
                    ))
                })?;

            let mut parameter = ToolParameter::new(param_name.clone(), kind);
            parameter.description = property
                .get("description")
                .and_then(Value::as_str)
                .map(String::from);
            parameter.allowed_values = property.get("enum").and_then(Value::as_array).map(|v| {
                v.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            });
            parameter.required = required.contains(&param_name.as_str());
            descriptor = descriptor.with_parameter(parameter);
        }
    }

    descriptor
        .validate()
        .map_err(|e| AgentError::InvalidRequest(e.to_string()))?;
    Ok(descriptor)
}

/// Decode a tool call as the model produced it. Undecodable arguments and
/// invalid function names are kept on the call as an error so the call is
/// still answered.
pub fn parse_tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    if !is_valid_function_name(name) {
        return ToolCall::with_argument_error(
            id,
            name,
            format!(
                "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                name
            ),
        );
    }

    let arguments = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };

    match serde_json::from_str::<Value>(arguments) {
        Ok(value @ Value::Object(_)) => ToolCall::new(id, name, value),
        Ok(other) => ToolCall::with_argument_error(
            id,
            name,
            format!("Tool arguments for id {} must be a JSON object, got {}", id, other),
        ),
        Err(e) => ToolCall::with_argument_error(
            id,
            name,
            format!("Could not interpret tool use parameters for id {}: {}", id, e),
        ),
    }
}

fn get_usage(data: &Value) -> Usage {
    let Some(usage) = data.get("usage") else {
        return Usage::default();
    };
    let count = |key: &str| {
        usage
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
    };

    let prompt_tokens = count("prompt_tokens").unwrap_or(0);
    let completion_tokens = count("completion_tokens").unwrap_or(0);
    let total_tokens = count("total_tokens")
        .unwrap_or_else(|| prompt_tokens.saturating_add(completion_tokens));

    Usage::new(prompt_tokens, completion_tokens, total_tokens)
}

/// Convert a chat completions response body into a completion
pub fn response_to_completion(response: &Value) -> Result<Completion, ClientError> {
    if let Some(error) = response.get("error") {
        return Err(ClientError::Api(error.to_string()));
    }

    let choice = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| ClientError::MalformedResponse("response has no choices".into()))?;
    let message = choice
        .get("message")
        .ok_or_else(|| ClientError::MalformedResponse("choice has no message".into()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .map(String::from);

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in calls {
            let id = call
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| ClientError::MalformedResponse("tool call has no id".into()))?;
            let function = call.get("function").ok_or_else(|| {
                ClientError::MalformedResponse(format!("tool call {} has no function", id))
            })?;
            let name = function
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            // Some providers send arguments already decoded
            let arguments = match function.get("arguments") {
                Some(Value::String(raw)) => raw.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            tool_calls.push(parse_tool_call(id, name, &arguments));
        }
    }

    Ok(Completion {
        id: response
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        model: response
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content,
        tool_calls,
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(String::from),
        usage: get_usage(response),
    })
}
