use agentloop::agent::{Agent, AgentRequest, ChatRequest, FinishReason};
use agentloop::models::message::Message;
use agentloop::models::role::Role;
use agentloop::providers::configs::MistralProviderConfig;
use agentloop::providers::mistral::MistralProvider;
use agentloop::tools::create_default_registry;
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion_body(id: &str, message: Value, finish_reason: &str) -> Value {
    json!({
        "id": id,
        "object": "chat.completion",
        "model": "mistral-small-latest",
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {"prompt_tokens": 40, "completion_tokens": 10, "total_tokens": 50}
    })
}

/// Agent wired to a mistral provider pointed at a local mock server
async fn setup() -> Result<(MockServer, Agent)> {
    let server = MockServer::start().await;
    let provider = MistralProvider::new(
        MistralProviderConfig::new("test_api_key").with_host(server.uri()),
    )?;
    let agent = Agent::new(Arc::new(provider), Arc::new(create_default_registry()?));
    Ok((server, agent))
}

#[tokio::test]
async fn test_calculator_round_trip() -> Result<()> {
    let (server, agent) = setup().await?;

    // Once the transcript carries a tool result, the model answers in text
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"role\":\"tool\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "cmpl-2",
            json!({"role": "assistant", "content": "25 multiplied by 17 is 425."}),
            "stop",
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "cmpl-1",
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": "call_mul",
                    "type": "function",
                    "function": {
                        "name": "calculator",
                        "arguments": "{\"operation\": \"multiply\", \"a\": 25, \"b\": 17}"
                    }
                }]
            }),
            "tool_calls",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = agent
        .run(AgentRequest::new(vec![
            Message::system().with_text("You are a careful calculator."),
            Message::user().with_text("What is 25 * 17?"),
        ]))
        .await?;

    assert_eq!(result.finish_reason, FinishReason::Stop);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.id, "cmpl-2");
    assert_eq!(result.content.as_deref(), Some("25 multiplied by 17 is 425."));
    assert_eq!(result.usage.total_tokens, 100);
    assert_eq!(result.tool_calls_made.len(), 1);
    assert_eq!(result.tool_calls_made[0].result.as_deref(), Some("425"));

    let tool_message = &result.transcript.messages()[3];
    assert_eq!(tool_message.role, Role::Tool);
    assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_mul"));
    assert_eq!(tool_message.text(), Some("425"));
    Ok(())
}

#[tokio::test]
async fn test_upstream_failure_ends_run() -> Result<()> {
    let (server, agent) = setup().await?;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let result = agent
        .run(AgentRequest::new(vec![Message::user().with_text("hi")]))
        .await?;

    assert_eq!(result.finish_reason, FinishReason::ApiError);
    assert_eq!(result.iterations, 1);
    assert!(result.content.is_none());
    assert!(result.error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_plain_chat() -> Result<()> {
    let (server, agent) = setup().await?;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "cmpl-chat",
            json!({"role": "assistant", "content": "Hello!"}),
            "stop",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let response = agent
        .chat(ChatRequest::new(vec![Message::user().with_text("Say hello")]))
        .await?;

    assert_eq!(response.content, "Hello!");
    assert_eq!(response.model, "mistral-small-latest");
    assert_eq!(response.usage.prompt_tokens, 40);

    let received = server.received_requests().await.unwrap_or_default();
    let body: Value = serde_json::from_slice(&received[0].body)?;
    assert!(body.get("tools").is_none());
    Ok(())
}
