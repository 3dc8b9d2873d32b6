use crate::error::ApiError;
use agentloop::models::message::Message;
use agentloop::models::role::Role;
use agentloop::providers::utils::parse_tool_call;
use serde::Deserialize;
use serde_json::json;

// Types matching the incoming JSON structure, which follows the
// chat completions wire format
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_call_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<IncomingToolCall>>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingToolCall {
    id: String,
    function: IncomingFunction,
}

#[derive(Debug, Deserialize)]
pub struct IncomingFunction {
    name: String,
    arguments: String,
}

// Convert incoming messages to our internal Message type. Assistant tool
// calls whose arguments do not decode are rejected rather than rewritten.
pub fn convert_messages(incoming: Vec<IncomingMessage>) -> Result<Vec<Message>, ApiError> {
    incoming
        .into_iter()
        .map(|msg| {
            let tool_calls = msg
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| {
                    let parsed =
                        parse_tool_call(&call.id, &call.function.name, &call.function.arguments);
                    if let Some(error) = &parsed.argument_error {
                        return Err(ApiError::validation(error.clone()).with_details(json!({
                            "tool_call_id": call.id,
                            "arguments": call.function.arguments,
                        })));
                    }
                    Ok(parsed)
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut message = match msg.role {
                Role::System => Message::system(),
                Role::User => Message::user(),
                Role::Assistant => Message::assistant().with_tool_calls(tool_calls),
                Role::Tool => Message::tool(
                    msg.tool_call_id.unwrap_or_default(),
                    msg.name.unwrap_or_default(),
                    String::new(),
                ),
            };
            message.content = msg.content;
            Ok(message)
        })
        .collect()
}
