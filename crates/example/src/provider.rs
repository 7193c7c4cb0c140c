//! An offline chat-completion provider.
//!
//! [`DeskTransport`] answers from keywords instead of calling a remote API,
//! but speaks the usual chat-completion shape so that [`ChatCompletionConverter`]
//! reads it the way a real provider bridge would.

use async_trait::async_trait;
use lodestar_models::catalog::{CatalogEntry, StaticModelCatalog};
use lodestar_models::{Capability, Model, Options, ToolCall};
use lodestar_platform::{Metadata, ModelResult, PlatformError, RawResult, ResultConverter, Transport};
use serde_json::{Map, Value, json};

/// Model family served by this provider.
pub const FAMILY: &str = "desk";

/// Returns the catalog of the desk models.
#[must_use]
pub fn catalog() -> StaticModelCatalog {
    StaticModelCatalog::new([
        (
            "desk-router",
            CatalogEntry::new(
                FAMILY,
                [
                    Capability::InputMessages,
                    Capability::OutputText,
                    Capability::OutputStructured,
                ],
            ),
        ),
        (
            "desk-agent*",
            CatalogEntry::new(
                FAMILY,
                [
                    Capability::InputMessages,
                    Capability::OutputText,
                    Capability::ToolCalling,
                ],
            ),
        ),
    ])
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Answers chat requests locally.
///
/// - With `response_format` set, it returns a routing decision as JSON text.
/// - After a tool reply, it summarizes the tool's answer.
/// - With tools advertised and an order number in the question, it asks for
///   the `order_status` tool.
/// - Otherwise it echoes the question.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeskTransport;

impl DeskTransport {
    fn route(question: &str) -> (&'static str, &'static str) {
        let question = question.to_lowercase();
        if ["order", "shipping", "delivery"]
            .iter()
            .any(|word| question.contains(word))
        {
            ("orders", "mentions an order")
        } else if ["invoice", "refund", "charge"]
            .iter()
            .any(|word| question.contains(word))
        {
            ("billing", "mentions a payment")
        } else {
            ("", "no specialist matches")
        }
    }

    fn answer(model: &Model, messages: &[Value], options: &Options) -> Value {
        let last = messages.last().cloned().unwrap_or(Value::Null);
        let content = last["content"].as_str().unwrap_or_default();

        if options.response_format().is_some() {
            let question = content
                .lines()
                .find_map(|line| line.strip_prefix("User question: "))
                .map_or(content, |quoted| quoted.trim_matches('"'));
            let (agent_name, reasoning) = Self::route(question);
            return message(json!({
                "role": "assistant",
                "content": json!({"agentName": agent_name, "reasoning": reasoning}).to_string(),
            }));
        }

        if last["role"] == "tool" {
            return message(json!({"role": "assistant", "content": content}));
        }

        let order_id = content
            .split(|c: char| !c.is_ascii_digit())
            .find(|digits| digits.len() >= 4);
        if let Some(order_id) = order_id
            && options.contains_key(Options::TOOLS)
        {
            return message(json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": format!("call_{order_id}"),
                    "type": "function",
                    "function": {
                        "name": "order_status",
                        "arguments": json!({"order_id": order_id}).to_string(),
                    },
                }],
            }));
        }

        let system = messages
            .iter()
            .find(|message| message["role"] == "system")
            .and_then(|message| message["content"].as_str())
            .unwrap_or("an assistant");
        message(json!({
            "role": "assistant",
            "content": format!("[{} as {system}] You asked: {content}", model.name()),
        }))
    }
}

fn message(message: Value) -> Value {
    json!({
        "choices": [{"index": 0, "message": message}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 8},
    })
}

#[async_trait]
impl Transport for DeskTransport {
    fn supports(&self, model: &Model) -> bool {
        model.family() == FAMILY
    }

    async fn request(
        &self,
        model: &Model,
        payload: Value,
        options: &Options,
    ) -> Result<RawResult, PlatformError> {
        let messages = payload["messages"]
            .as_array()
            .ok_or_else(|| PlatformError::InvalidResponse("payload has no messages".to_string()))?;

        tracing::debug!(model = model.name(), messages = messages.len(), "Desk request");
        Ok(RawResult::json(Self::answer(model, messages, options)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Converter
// ─────────────────────────────────────────────────────────────────────────────

/// Converts a chat-completion body into text or tool calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCompletionConverter;

impl ChatCompletionConverter {
    fn tool_call(call: &Value) -> Result<ToolCall, PlatformError> {
        let invalid = || PlatformError::InvalidResponse(format!("malformed tool call: {call}"));

        let id = call["id"].as_str().ok_or_else(invalid)?;
        let name = call["function"]["name"].as_str().ok_or_else(invalid)?;
        let arguments = match call["function"]["arguments"].as_str() {
            Some(raw) if !raw.trim().is_empty() => {
                serde_json::from_str::<Map<String, Value>>(raw).map_err(|_| invalid())?
            }
            _ => Map::new(),
        };

        Ok(ToolCall::new(id, name, arguments))
    }
}

#[async_trait]
impl ResultConverter for ChatCompletionConverter {
    fn supports(&self, model: &Model) -> bool {
        model.family() == FAMILY
    }

    async fn convert(&self, raw: &mut RawResult, _: &Options) -> Result<ModelResult, PlatformError> {
        let data = raw.data();
        let message = &data["choices"][0]["message"];

        let mut metadata = Metadata::new();
        if let Some(usage) = data.get("usage") {
            metadata.insert("usage", usage.clone());
        }

        if let Some(calls) = message["tool_calls"].as_array()
            && !calls.is_empty()
        {
            let calls = calls
                .iter()
                .map(Self::tool_call)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ModelResult::tool_calls(calls).with_metadata(metadata));
        }

        message["content"]
            .as_str()
            .map(|text| ModelResult::text(text).with_metadata(metadata))
            .ok_or_else(|| PlatformError::InvalidResponse("response has no choices".to_string()))
    }
}
