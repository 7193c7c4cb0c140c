//! Default normalizers producing the widely used chat-completions shape.

use super::{Contract, NormalizeContext, Normalizer, Subject};
use crate::error::ContractError;
use lodestar_models::{Content, Message};
use serde_json::{Map, Value, json};

fn unsupported(subject: &Subject<'_>) -> ContractError {
    ContractError::Unsupported {
        shape: subject.shape().to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────────────────────────────

/// `MessageBag` → `{messages: [...], model?: name}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageBagNormalizer;

impl Normalizer for MessageBagNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Bag(_))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        context: &NormalizeContext<'_>,
        contract: &Contract,
    ) -> Result<Value, ContractError> {
        let Subject::Bag(bag) = subject else {
            return Err(unsupported(subject));
        };

        let messages = bag
            .iter()
            .map(|message| contract.normalize(&Subject::Message(message), context))
            .collect::<Result<Vec<_>, _>>()?;

        let mut envelope = Map::new();
        envelope.insert("messages".to_string(), Value::Array(messages));
        if let Some(model) = context.model {
            envelope.insert("model".to_string(), Value::String(model.name().to_string()));
        }
        Ok(Value::Object(envelope))
    }
}

/// System message → `{role: "system", content}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMessageNormalizer;

impl Normalizer for SystemMessageNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Message(Message::System { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        match subject {
            Subject::Message(Message::System { content }) => {
                Ok(json!({"role": "system", "content": content}))
            }
            _ => Err(unsupported(subject)),
        }
    }
}

/// User message → `{role: "user", content}`.
///
/// A message holding a single text part collapses to a plain string; any
/// other message becomes a list of normalized parts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserMessageNormalizer;

impl Normalizer for UserMessageNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Message(Message::User { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        context: &NormalizeContext<'_>,
        contract: &Contract,
    ) -> Result<Value, ContractError> {
        let Subject::Message(Message::User { content }) = subject else {
            return Err(unsupported(subject));
        };

        let content = match content.as_slice() {
            [Content::Text { text }] => Value::String(text.clone()),
            parts => Value::Array(
                parts
                    .iter()
                    .map(|part| contract.normalize(&Subject::Content(part), context))
                    .collect::<Result<_, _>>()?,
            ),
        };

        Ok(json!({"role": "user", "content": content}))
    }
}

/// Assistant message → `{role: "assistant", content?, tool_calls?}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssistantMessageNormalizer;

impl Normalizer for AssistantMessageNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Message(Message::Assistant { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        context: &NormalizeContext<'_>,
        contract: &Contract,
    ) -> Result<Value, ContractError> {
        let Subject::Message(Message::Assistant {
            content,
            tool_calls,
        }) = subject
        else {
            return Err(unsupported(subject));
        };

        let mut message = Map::new();
        message.insert("role".to_string(), json!("assistant"));
        if let Some(content) = content {
            message.insert("content".to_string(), Value::String(content.clone()));
        }
        if !tool_calls.is_empty() {
            let calls = tool_calls
                .iter()
                .map(|call| contract.normalize(&Subject::ToolCall(call), context))
                .collect::<Result<Vec<_>, _>>()?;
            message.insert("tool_calls".to_string(), Value::Array(calls));
        }
        Ok(Value::Object(message))
    }
}

/// Tool answer → `{role: "tool", content, tool_call_id}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCallMessageNormalizer;

impl Normalizer for ToolCallMessageNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Message(Message::ToolCall { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        match subject {
            Subject::Message(Message::ToolCall { tool_call, content }) => Ok(json!({
                "role": "tool",
                "content": content,
                "tool_call_id": tool_call.id,
            })),
            _ => Err(unsupported(subject)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Content parts
// ─────────────────────────────────────────────────────────────────────

/// Text part → `{type: "text", text}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextContentNormalizer;

impl Normalizer for TextContentNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Content(Content::Text { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        match subject {
            Subject::Content(Content::Text { text }) => Ok(json!({"type": "text", "text": text})),
            _ => Err(unsupported(subject)),
        }
    }
}

/// Inline image → `{type: "image_url", image_url: {url: <data url>}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageNormalizer;

impl Normalizer for ImageNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Content(Content::Image { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        match subject {
            Subject::Content(content @ Content::Image { .. }) => Ok(json!({
                "type": "image_url",
                "image_url": {"url": content.data_url()},
            })),
            _ => Err(unsupported(subject)),
        }
    }
}

/// Image by URL → `{type: "image_url", image_url: {url}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageUrlNormalizer;

impl Normalizer for ImageUrlNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Content(Content::ImageUrl { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        match subject {
            Subject::Content(Content::ImageUrl { url }) => Ok(json!({
                "type": "image_url",
                "image_url": {"url": url},
            })),
            _ => Err(unsupported(subject)),
        }
    }
}

/// Audio → `{type: "input_audio", input_audio: {data, format}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioNormalizer;

impl Normalizer for AudioNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Content(Content::Audio { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        match subject {
            Subject::Content(Content::Audio { data, format }) => Ok(json!({
                "type": "input_audio",
                "input_audio": {"data": data, "format": format},
            })),
            _ => Err(unsupported(subject)),
        }
    }
}

/// Document → `{type: "file", file: {filename?, file_data: <data url>}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileNormalizer;

impl Normalizer for FileNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Content(Content::File { .. }))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        let Subject::Content(content @ Content::File { name, .. }) = subject else {
            return Err(unsupported(subject));
        };

        let mut file = Map::new();
        if let Some(name) = name {
            file.insert("filename".to_string(), Value::String(name.clone()));
        }
        file.insert("file_data".to_string(), json!(content.data_url()));
        Ok(json!({"type": "file", "file": file}))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────────────────────────────

/// Tool call → `{id, type: "function", function: {name, arguments: <json string>}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCallNormalizer;

impl Normalizer for ToolCallNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::ToolCall(_))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        let Subject::ToolCall(call) = subject else {
            return Err(unsupported(subject));
        };

        Ok(json!({
            "id": call.id,
            "type": "function",
            "function": {
                "name": call.name,
                "arguments": serde_json::to_string(&call.arguments)?,
            },
        }))
    }
}

/// Tool descriptor → `{type: "function", function: {name, description, parameters}}`.
///
/// Tools without parameters, and schemas whose `properties` is missing or
/// null, get an explicit empty `properties` object. Several providers reject
/// object schemas without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolNormalizer;

impl Normalizer for ToolNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Tool(_))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        let Subject::Tool(tool) = subject else {
            return Err(unsupported(subject));
        };

        let mut parameters = tool
            .parameters
            .clone()
            .unwrap_or_else(|| json!({"type": "object"}));
        if let Value::Object(schema) = &mut parameters
            && schema.get("type").and_then(Value::as_str) == Some("object")
        {
            let empty = match schema.get("properties") {
                None | Some(Value::Null) => true,
                Some(Value::Array(items)) => items.is_empty(),
                Some(_) => false,
            };
            if empty {
                schema.insert("properties".to_string(), Value::Object(Map::new()));
            }
        }

        Ok(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": parameters,
            },
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Raw inputs
// ─────────────────────────────────────────────────────────────────────

/// Raw text → JSON string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextNormalizer;

impl Normalizer for PlainTextNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Text(_))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        match subject {
            Subject::Text(text) => Ok(Value::String((*text).to_string())),
            _ => Err(unsupported(subject)),
        }
    }
}

/// Pre-built JSON, passed through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNormalizer;

impl Normalizer for JsonNormalizer {
    fn supports(&self, subject: &Subject<'_>, _: &NormalizeContext<'_>) -> bool {
        matches!(subject, Subject::Json(_))
    }

    fn normalize(
        &self,
        subject: &Subject<'_>,
        _: &NormalizeContext<'_>,
        _: &Contract,
    ) -> Result<Value, ContractError> {
        match subject {
            Subject::Json(value) => Ok((*value).clone()),
            _ => Err(unsupported(subject)),
        }
    }
}
