//! Ollama `/api/chat` provider with native tool calling.
//!
//! Responses are reported as the model produced them. Anything odd about a
//! call (arguments sent as a string that is not a JSON object, for example)
//! is handed on as text so the bridge can diagnose it.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use toolbridge_runtime::conversation::{Fragment, Role, Turn};
use toolbridge_runtime::model::{FinishSignal, ModelRequest, ModelResponse};
use toolbridge_runtime::provider::{ModelError, ModelProvider};
use toolbridge_runtime::tool::{ToolCall, ToolDefinition};

pub struct OllamaChatProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
}

impl OllamaChatProvider {
    pub fn new(url: String, model: String, temperature: f32) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            model,
            temperature,
        }
    }
}

#[async_trait]
impl ModelProvider for OllamaChatProvider {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/api/chat", self.url);
        let body = request_body(&self.model, self.temperature, &request);

        debug!("Ollama request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::ApiError { status, message });
        }

        let resp: Value = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        parse_response(&resp)
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

fn tool_definition_to_ollama(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        },
    })
}

/// One turn may become several chat messages: its text and calls first, then
/// one `tool` message per result envelope.
fn turn_to_ollama(turn: &Turn) -> Vec<Value> {
    let role = match turn.role {
        Role::User => "user",
        Role::Model => "assistant",
    };

    let mut messages = Vec::new();
    let calls: Vec<Value> = turn
        .tool_calls()
        .map(|call| {
            json!({
                "function": {
                    "name": call.name,
                    "arguments": call.arguments,
                },
            })
        })
        .collect();
    let text = turn.text();
    if text.is_some() || !calls.is_empty() {
        let mut message = json!({
            "role": role,
            "content": text.unwrap_or_default(),
        });
        if !calls.is_empty() {
            message["tool_calls"] = Value::Array(calls);
        }
        messages.push(message);
    }

    for fragment in &turn.fragments {
        if let Fragment::ToolResult(envelope) = fragment {
            messages.push(json!({
                "role": "tool",
                "tool_name": envelope.name,
                "content": envelope
                    .result
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_default(),
            }));
        }
    }
    messages
}

pub(crate) fn request_body(model: &str, temperature: f32, request: &ModelRequest) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system_prompt {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.extend(request.turns.iter().flat_map(turn_to_ollama));

    let mut body = json!({
        "model": model,
        "messages": messages,
        "stream": false,
        "options": {
            "temperature": temperature,
        },
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(request.tools.iter().map(tool_definition_to_ollama).collect());
    }
    body
}

pub(crate) fn parse_response(resp: &Value) -> Result<ModelResponse, ModelError> {
    let message = resp
        .get("message")
        .ok_or_else(|| ModelError::InvalidResponse("missing message".into()))?;

    let mut fragments = Vec::new();
    if let Some(content) = message.get("content").and_then(Value::as_str) {
        if !content.trim().is_empty() {
            fragments.push(Fragment::text(content));
        }
    }

    let calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for call in calls {
        let function = call.get("function").unwrap_or(call);
        match function.get("name").and_then(Value::as_str) {
            Some(name) => fragments.push(call_fragment(name, function.get("arguments"))),
            None => {
                debug!(call = %call, "tool call without a name, keeping it as text");
                fragments.push(Fragment::text(call.to_string()));
            }
        }
    }

    debug!(
        done_reason = resp.get("done_reason").and_then(serde_json::Value::as_str).unwrap_or("-"),
        fragments = fragments.len(),
        "Ollama response"
    );

    let finish = if fragments.iter().any(|f| f.as_tool_call().is_some()) {
        FinishSignal::Continue
    } else {
        FinishSignal::Stop
    };
    Ok(ModelResponse::new(fragments, finish))
}

fn call_fragment(name: &str, arguments: Option<&Value>) -> Fragment {
    let arguments = match arguments {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => return Fragment::text(json!({"name": name, "arguments": raw}).to_string()),
        },
        Some(other) => {
            return Fragment::text(json!({"name": name, "arguments": other}).to_string())
        }
    };
    Fragment::ToolCall(ToolCall::new(name, arguments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolbridge_runtime::tool::ToolResultEnvelope;

    #[test]
    fn test_request_body() {
        let request = ModelRequest {
            system_prompt: Some("Be brief.".to_string()),
            turns: vec![
                Turn::user_text("What is 2+2?"),
                Turn::model(vec![Fragment::ToolCall(ToolCall::new(
                    "calc",
                    json!({"expression": "2+2"}).as_object().cloned().unwrap(),
                ))]),
                Turn::user(vec![Fragment::text("calc result: 4")]),
            ],
            tools: vec![ToolDefinition {
                name: "calc".to_string(),
                description: "Evaluate".to_string(),
                input_schema: json!({"type": "object"}),
            }],
        };

        let body = request_body("llama3:8b", 0.0, &request);

        assert_eq!(body["model"], "llama3:8b");
        assert_eq!(body["stream"], false);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], json!({"role": "system", "content": "Be brief."}));
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"]["expression"],
            "2+2"
        );
        assert_eq!(messages[3], json!({"role": "user", "content": "calc result: 4"}));
        assert_eq!(body["tools"][0]["function"]["name"], "calc");
    }

    #[test]
    fn test_tool_result_envelope_becomes_tool_message() {
        let request = ModelRequest {
            turns: vec![Turn::user(vec![Fragment::ToolResult(ToolResultEnvelope::new(
                "calc",
                Some(json!({"result": "4"})),
            ))])],
            ..Default::default()
        };

        let body = request_body("m", 0.0, &request);

        assert_eq!(
            body["messages"],
            json!([{"role": "tool", "tool_name": "calc", "content": "{\"result\":\"4\"}"}])
        );
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_text() {
        let response = parse_response(&json!({
            "message": {"role": "assistant", "content": "The answer is 24."},
            "done": true,
            "done_reason": "stop"
        }))
        .unwrap();

        assert_eq!(response.fragments, vec![Fragment::text("The answer is 24.")]);
        assert_eq!(response.finish, FinishSignal::Stop);
    }

    #[test]
    fn test_parse_native_calls() {
        let response = parse_response(&json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "calc", "arguments": {"expression": "2*(5+7)"}}},
                    {"function": {"name": "http_get", "arguments": "{\"url\": \"https://example.com\"}"}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(response.fragments.len(), 2);
        assert_eq!(response.finish, FinishSignal::Continue);
        let first = response.fragments[0].as_tool_call().unwrap();
        assert_eq!(first.name, "calc");
        assert_eq!(first.arguments["expression"], "2*(5+7)");
        let second = response.fragments[1].as_tool_call().unwrap();
        assert_eq!(second.arguments["url"], "https://example.com");
    }

    #[test]
    fn test_unusable_arguments_are_handed_on_as_text() {
        let response = parse_response(&json!({
            "message": {
                "content": "",
                "tool_calls": [{"function": {"name": "calc", "arguments": "2+2"}}]
            }
        }))
        .unwrap();

        let text = response.fragments[0].as_text().unwrap();
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, json!({"name": "calc", "arguments": "2+2"}));
        assert_eq!(response.finish, FinishSignal::Stop);
    }

    #[test]
    fn test_nameless_call_is_kept_as_text() {
        let response = parse_response(&json!({
            "message": {
                "content": "",
                "tool_calls": [
                    {"function": {"arguments": {"expression": "2+2"}}},
                    {"function": {"name": "calc", "arguments": {"expression": "1"}}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(response.fragments.len(), 2);
        let text = response.fragments[0].as_text().unwrap();
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, json!({"function": {"arguments": {"expression": "2+2"}}}));
        assert_eq!(response.fragments[1].as_tool_call().unwrap().name, "calc");
        assert_eq!(response.finish, FinishSignal::Continue);
    }

    #[test]
    fn test_missing_message_is_invalid() {
        let err = parse_response(&json!({"error": "model not found"})).unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));
    }
}
