use serde_json::Value;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::ToolDescriptor;

/// Check decoded arguments against a tool's parameter schema.
///
/// Required parameters must be present and non-null, present parameters must
/// have a plausible JSON type, and string values of enumerated parameters must
/// be one of the allowed values. Arguments the schema does not mention are
/// passed through untouched.
pub fn validate_arguments(descriptor: &ToolDescriptor, arguments: &Value) -> AgentResult<()> {
    let empty = serde_json::Map::new();
    let object = match arguments {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(AgentError::InvalidParameters(format!(
                "arguments for '{}' must be a JSON object, got {}",
                descriptor.name, other
            )))
        }
    };

    for parameter in descriptor.required_parameters() {
        if object.get(&parameter.name).map_or(true, Value::is_null) {
            return Err(AgentError::InvalidParameters(format!(
                "missing required parameter '{}'",
                parameter.name
            )));
        }
    }

    for (name, value) in object {
        let Some(parameter) = descriptor.parameter(name) else {
            continue;
        };
        if value.is_null() && !parameter.required {
            continue;
        }
        if !parameter.kind.accepts(value) {
            return Err(AgentError::InvalidParameters(format!(
                "parameter '{}' must be of type {}, got {}",
                name,
                parameter.kind.as_str(),
                value
            )));
        }
        if let (Some(allowed), Some(text)) = (&parameter.allowed_values, value.as_str()) {
            if !allowed.iter().any(|v| v == text) {
                return Err(AgentError::InvalidParameters(format!(
                    "parameter '{}' must be one of [{}], got '{}'",
                    name,
                    allowed.join(", "),
                    text
                )));
            }
        }
    }

    Ok(())
}
