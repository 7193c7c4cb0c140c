//! Structured output via strict JSON schemas.

use super::{Input, InputProcessor, Output, OutputProcessor};
use crate::error::AgentError;
use async_trait::async_trait;
use lodestar_models::{Capability, Options};
use lodestar_platform::{ModelResult, ResultKind};
use serde_json::{Map, Value, json};

/// String formats accepted by strict-mode schemas.
const STRICT_FORMATS: &[&str] = &[
    "date-time", "time", "date", "duration", "email", "hostname", "uri", "ipv4", "ipv6", "uuid",
];

/// Keywords strict-mode schemas reject.
const STRIPPED_KEYWORDS: &[&str] = &[
    "$schema",
    "title",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "maxItems",
    "uniqueItems",
    "minProperties",
    "maxProperties",
];

/// Rewrites a JSON schema into the subset accepted by strict structured output.
///
/// - Every object schema gets `additionalProperties: false`.
/// - Numeric, length and count constraints are removed, as are `$schema`
///   and `title`.
/// - Unknown string formats and `minItems` above 1 are removed.
/// - External `$ref` URLs are removed, as are `$ref` entries inside `allOf`.
///
/// Nested schemas (`properties`, `items`, `allOf`/`anyOf`/`oneOf`, `$defs`,
/// `definitions`) are processed recursively. Each removal is logged at `warn`.
#[must_use]
pub fn normalize_schema_for_strict_mode(schema: Value) -> Value {
    match schema {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(normalize_schema_for_strict_mode)
                .collect(),
        ),
        Value::Object(object) => Value::Object(normalize_object(object)),
        other => other,
    }
}

fn normalize_object(mut schema: Map<String, Value>) -> Map<String, Value> {
    for keyword in STRIPPED_KEYWORDS {
        if schema.remove(*keyword).is_some() {
            tracing::warn!(keyword = *keyword, "Stripped schema keyword for strict mode");
        }
    }

    let unsupported_format = schema
        .get("format")
        .is_some_and(|format| format.as_str().is_none_or(|f| !STRICT_FORMATS.contains(&f)));
    if unsupported_format && let Some(format) = schema.remove("format") {
        tracing::warn!(%format, "Stripped string format for strict mode");
    }

    let unsupported_min_items = schema
        .get("minItems")
        .is_some_and(|min| min.as_u64().is_none_or(|n| n > 1));
    if unsupported_min_items && let Some(min_items) = schema.remove("minItems") {
        tracing::warn!(%min_items, "Stripped minItems for strict mode");
    }

    let external_ref = schema
        .get("$ref")
        .and_then(Value::as_str)
        .is_some_and(|target| target.starts_with("http://") || target.starts_with("https://"));
    if external_ref && let Some(target) = schema.remove("$ref") {
        tracing::warn!(%target, "Stripped external $ref for strict mode");
    }

    if schema.get("type").and_then(Value::as_str) == Some("object")
        || schema.contains_key("properties")
    {
        schema.insert("additionalProperties".to_string(), Value::Bool(false));
    }

    for key in ["properties", "$defs", "definitions"] {
        if let Some(Value::Object(children)) = schema.get_mut(key) {
            for child in children.values_mut() {
                *child = normalize_schema_for_strict_mode(child.take());
            }
        }
    }

    if let Some(items) = schema.get_mut("items") {
        *items = normalize_schema_for_strict_mode(items.take());
    }

    for key in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(branches)) = schema.get_mut(key) {
            for branch in branches.iter_mut() {
                *branch = normalize_schema_for_strict_mode(branch.take());
            }
        }
    }

    let mut all_of_emptied = false;
    if let Some(Value::Array(all_of)) = schema.get_mut("allOf") {
        let before = all_of.len();
        all_of.retain(|branch| branch.get("$ref").is_none());
        if all_of.len() < before {
            tracing::warn!(removed = before - all_of.len(), "Stripped $ref from allOf for strict mode");
            all_of_emptied = all_of.is_empty();
        }
    }
    if all_of_emptied {
        schema.remove("allOf");
    }

    schema
}

/// Turns a JSON schema `response_format` into a strict structured-output
/// request, and the model's JSON answer into an object result.
///
/// On input, a `response_format` that is a bare JSON schema (for example
/// `schemars::schema_for!(T)`) is wrapped as
/// `{"type": "json_schema", "json_schema": {"name", "schema", "strict": true}}`
/// after [`normalize_schema_for_strict_mode`]. The schema's `title` becomes
/// the name. Formats that are already wrapped are left alone. The model must
/// support [`Capability::OutputStructured`].
///
/// On output, a text result of a structured request is parsed as JSON and
/// replaced by an object result with the same metadata. Text that is not
/// JSON is kept as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredOutputProcessor;

impl StructuredOutputProcessor {
    /// Creates the processor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn is_wrapped(format: &Value) -> bool {
    match format.get("type").and_then(Value::as_str) {
        Some("json_schema") => format.get("json_schema").is_some(),
        Some("json_object" | "text") => true,
        _ => false,
    }
}

fn schema_name(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .map_or(text, str::trim)
}

#[async_trait]
impl InputProcessor for StructuredOutputProcessor {
    async fn process_input(&self, input: &mut Input) -> Result<(), AgentError> {
        let Some(format) = input.options.response_format() else {
            return Ok(());
        };
        if is_wrapped(format) {
            return Ok(());
        }
        if !input.model.supports(Capability::OutputStructured) {
            return Err(AgentError::MissingCapability {
                model: input.model.name().to_string(),
                capability: Capability::OutputStructured,
            });
        }

        let name = format
            .get("title")
            .and_then(Value::as_str)
            .map_or_else(|| "response".to_string(), schema_name);
        let schema = normalize_schema_for_strict_mode(format.clone());
        tracing::debug!(model = input.model.name(), schema = %name, "Requesting structured output");

        input.options.insert(
            Options::RESPONSE_FORMAT,
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": name,
                    "schema": schema,
                    "strict": true,
                },
            }),
        );
        Ok(())
    }
}

#[async_trait]
impl OutputProcessor for StructuredOutputProcessor {
    async fn process_output(&self, output: &mut Output) -> Result<(), AgentError> {
        if output.options.response_format().is_none() {
            return Ok(());
        }
        let ResultKind::Text(text) = output.result.kind() else {
            return Ok(());
        };

        match serde_json::from_str::<Value>(strip_code_fence(text)) {
            Ok(value) => {
                let metadata = output.result.metadata().clone();
                output.result = ModelResult::object(value).with_metadata(metadata);
            }
            Err(err) => {
                tracing::debug!(error = %err, "Structured answer is not JSON, keeping text");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_models::catalog::{CatalogEntry, FallbackModelCatalog, ModelCatalog};
    use lodestar_models::{MessageBag, Model};
    use schemars::JsonSchema;

    #[derive(JsonSchema)]
    #[expect(dead_code, reason = "only the schema is used")]
    struct Booking {
        /// Guest name.
        guest: String,
        nights: u8,
        rooms: Vec<Room>,
    }

    #[derive(JsonSchema)]
    #[expect(dead_code, reason = "only the schema is used")]
    struct Room {
        number: u16,
    }

    async fn structured_model() -> Model {
        FallbackModelCatalog::new().model("gpt-4o").await.unwrap()
    }

    fn input(model: Model, format: Value) -> Input {
        Input {
            model,
            messages: MessageBag::new(),
            options: Options::new().with(Options::RESPONSE_FORMAT, format),
        }
    }

    #[test]
    fn strict_schema_closes_every_object() {
        let schema = serde_json::to_value(schemars::schema_for!(Booking)).unwrap();
        let strict = normalize_schema_for_strict_mode(schema);

        assert_eq!(strict["additionalProperties"], json!(false));
        assert!(strict.get("$schema").is_none());
        assert!(strict.get("title").is_none());
        assert_eq!(strict["properties"]["guest"]["type"], "string");
        assert!(strict["properties"]["nights"].get("minimum").is_none());
        assert!(strict["properties"]["nights"].get("format").is_none());
        assert_eq!(strict["$defs"]["Room"]["additionalProperties"], json!(false));
    }

    #[test]
    fn unsupported_keywords_are_stripped() {
        let strict = normalize_schema_for_strict_mode(json!({
            "type": "array",
            "minItems": 3,
            "items": {"type": "string", "format": "phone"},
            "allOf": [{"$ref": "#/$defs/A"}],
        }));
        assert_eq!(strict, json!({"type": "array", "items": {"type": "string"}}));

        let kept = normalize_schema_for_strict_mode(json!({"type": "string", "format": "email"}));
        assert_eq!(kept["format"], "email");
    }

    #[tokio::test]
    async fn bare_schema_is_wrapped() {
        let schema = serde_json::to_value(schemars::schema_for!(Booking)).unwrap();
        let mut input = input(structured_model().await, schema);
        StructuredOutputProcessor.process_input(&mut input).await.unwrap();

        let format = input.options.response_format().unwrap();
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "Booking");
        assert_eq!(format["json_schema"]["strict"], true);
        assert_eq!(format["json_schema"]["schema"]["additionalProperties"], false);
    }

    #[tokio::test]
    async fn wrapped_formats_are_untouched() {
        let format = json!({"type": "json_object"});
        let mut input = input(structured_model().await, format.clone());
        StructuredOutputProcessor.process_input(&mut input).await.unwrap();
        assert_eq!(input.options.response_format(), Some(&format));
    }

    #[tokio::test]
    async fn model_without_structured_output_is_rejected() {
        let model = CatalogEntry::new("tiny", [Capability::OutputText])
            .to_model("tiny-1", Options::new())
            .unwrap();
        let mut input = input(model, json!({"type": "object"}));

        let err = StructuredOutputProcessor.process_input(&mut input).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::MissingCapability {
                capability: Capability::OutputStructured,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn json_text_becomes_an_object() {
        let mut output = Output {
            model: structured_model().await,
            result: ModelResult::text("```json\n{\"nights\": 2}\n```"),
            messages: MessageBag::new(),
            options: Options::new().with(Options::RESPONSE_FORMAT, json!({"type": "json_object"})),
        };
        StructuredOutputProcessor.process_output(&mut output).await.unwrap();
        assert_eq!(output.result.as_object().unwrap(), &json!({"nights": 2}));
    }

    #[tokio::test]
    async fn prose_stays_text() {
        let mut output = Output {
            model: structured_model().await,
            result: ModelResult::text("I can answer that directly."),
            messages: MessageBag::new(),
            options: Options::new().with(Options::RESPONSE_FORMAT, json!({"type": "json_object"})),
        };
        StructuredOutputProcessor.process_output(&mut output).await.unwrap();
        assert_eq!(output.result.as_text().unwrap(), "I can answer that directly.");
    }
}
