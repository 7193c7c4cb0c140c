//! Integration tests for the processor pipeline of [`ChatAgent`].

use async_trait::async_trait;
use lodestar_agent::{
    Agent, AgentAware, AgentError, AgentSlot, ChatAgent, Input, InputProcessor, Output,
    OutputProcessor, StructuredOutputProcessor, SystemPromptProcessor, ToolHandler, ToolProcessor,
    ToolRegistry,
};
use lodestar_models::catalog::{CatalogEntry, StaticModelCatalog};
use lodestar_models::{Message, MessageBag, Options, Role, Tool, ToolCall};
use lodestar_platform::testing::MockPlatform;
use lodestar_platform::{ModelResult, RequestInput};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex, Weak};

fn hello() -> MessageBag {
    MessageBag::new().with(Message::user("Hello"))
}

fn sent_messages(input: &RequestInput) -> &MessageBag {
    match input {
        RequestInput::Messages(bag) => bag,
        other => panic!("expected messages, got {other:?}"),
    }
}

/// Appends a marker to a shared log at each stage.
struct Marker {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl InputProcessor for Marker {
    async fn process_input(&self, input: &mut Input) -> Result<(), AgentError> {
        self.log.lock().unwrap().push(format!("in:{}", self.label));
        input.options.insert(self.label, true);
        Ok(())
    }
}

#[async_trait]
impl OutputProcessor for Marker {
    async fn process_output(&self, output: &mut Output) -> Result<(), AgentError> {
        self.log.lock().unwrap().push(format!("out:{}", self.label));
        output.result.metadata_mut().insert(self.label, true);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Pipeline
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn processors_run_in_registration_order() {
    let platform = Arc::new(MockPlatform::new().with_result(ModelResult::text("hi")));
    let log = Arc::new(Mutex::new(Vec::new()));

    let agent = ChatAgent::builder(platform.clone(), "gpt-4o")
        .processor(Marker {
            label: "first",
            log: log.clone(),
        })
        .processor(Marker {
            label: "second",
            log: log.clone(),
        })
        .build();

    let result = agent.call(hello(), Options::new()).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        ["in:first", "in:second", "out:first", "out:second"]
    );
    assert_eq!(result.metadata().get("second"), Some(&json!(true)));

    let calls = platform.calls();
    let call = &calls[0];
    assert!(call.options.contains_key("first"));
    assert!(call.options.contains_key("second"));
}

#[tokio::test]
async fn inline_model_options_reach_the_platform() {
    let platform = Arc::new(MockPlatform::new().with_result(ModelResult::text("hi")));
    let agent = ChatAgent::builder(platform.clone(), "gpt-4o?temperature=0.1&max_tokens=20").build();

    agent
        .call(hello(), Options::new().with("max_tokens", 99))
        .await
        .unwrap();

    let calls = platform.calls();
    assert_eq!(calls[0].model, "gpt-4o");
    assert_eq!(calls[0].options.get("temperature"), Some(&json!(0.1)));
    assert_eq!(calls[0].options.get("max_tokens"), Some(&json!(99)));
    assert_eq!(agent.name(), "gpt-4o?temperature=0.1&max_tokens=20");
}

#[tokio::test]
async fn system_prompt_is_sent_first() {
    let platform = Arc::new(MockPlatform::new().with_result(ModelResult::text("hi")));
    let agent = ChatAgent::builder(platform.clone(), "gpt-4o")
        .input_processor(SystemPromptProcessor::new("You are terse."))
        .build();

    agent.call(hello(), Options::new()).await.unwrap();

    let calls = platform.calls();
    let sent = sent_messages(&calls[0].input);
    assert_eq!(sent.messages()[0], Message::system("You are terse."));
    assert_eq!(sent.len(), 2);
}

#[tokio::test]
async fn unknown_model_is_reported() {
    let catalog = StaticModelCatalog::new([(
        "gpt-4o",
        CatalogEntry::new("gpt", [lodestar_models::Capability::OutputText]),
    )]);
    let platform = Arc::new(MockPlatform::new().with_catalog(catalog));
    let agent = ChatAgent::builder(platform.clone(), "mistral-large").build();

    let err = agent.call(hello(), Options::new()).await.unwrap_err();
    assert!(matches!(err, AgentError::Catalog(_)));
    assert_eq!(platform.invocations(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Back-references
// ═══════════════════════════════════════════════════════════════════════════════

struct Probe(Arc<AgentSlot>);

impl AgentAware for Probe {
    fn set_agent(&self, agent: Weak<dyn Agent>) {
        self.0.set(agent);
    }
}

#[async_trait]
impl InputProcessor for Probe {
    async fn process_input(&self, _: &mut Input) -> Result<(), AgentError> {
        Ok(())
    }

    fn agent_aware(&self) -> Option<&dyn AgentAware> {
        Some(self)
    }
}

#[tokio::test]
async fn agent_aware_processors_see_their_agent() {
    let slot = Arc::new(AgentSlot::new());
    let agent = ChatAgent::builder(Arc::new(MockPlatform::new()), "gpt-4o")
        .name("assistant")
        .input_processor(Probe(slot.clone()))
        .build();

    assert_eq!(slot.get().unwrap().name(), "assistant");

    let other: Arc<dyn Agent> = ChatAgent::builder(Arc::new(MockPlatform::new()), "x").build();
    assert!(!slot.set(Arc::downgrade(&other)));
    assert_eq!(slot.get().unwrap().name(), "assistant");

    drop(agent);
    assert!(slot.get().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tool calling
// ═══════════════════════════════════════════════════════════════════════════════

struct Clock;

#[async_trait]
impl ToolHandler for Clock {
    fn definition(&self) -> Tool {
        Tool::new("clock", "Returns the current time")
    }

    async fn call(&self, _: &Map<String, Value>) -> Result<String, AgentError> {
        Ok("12:00".to_string())
    }
}

fn clock_call() -> ModelResult {
    ModelResult::tool_calls(vec![ToolCall::new("call_1", "clock", Map::new())])
}

#[tokio::test]
async fn tool_calls_are_answered_and_the_agent_called_again() {
    let platform = Arc::new(
        MockPlatform::new()
            .with_result(clock_call())
            .with_result(ModelResult::text("It is noon.")),
    );
    let agent = ChatAgent::builder(platform.clone(), "gpt-4o")
        .processor(ToolProcessor::new(ToolRegistry::new().with(Clock)))
        .build();

    let result = agent.call(hello(), Options::new()).await.unwrap();
    assert_eq!(result.as_text().unwrap(), "It is noon.");

    let calls = platform.calls();
    assert_eq!(calls.len(), 2);
    let tools = calls[0].options.tools().unwrap().unwrap();
    assert_eq!(tools[0].name, "clock");

    let second = sent_messages(&calls[1].input);
    let roles: Vec<Role> = second.iter().map(Message::role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::ToolCall]);
    assert_eq!(second.messages()[2].text().as_deref(), Some("12:00"));
}

#[tokio::test]
async fn tool_rounds_are_bounded() {
    let platform = Arc::new(
        MockPlatform::new()
            .with_result(clock_call())
            .with_result(clock_call())
            .with_result(ModelResult::text("unreachable")),
    );
    let agent = ChatAgent::builder(platform.clone(), "gpt-4o")
        .processor(ToolProcessor::new(ToolRegistry::new().with(Clock)).with_max_iterations(1))
        .build();

    let err = agent.call(hello(), Options::new()).await.unwrap_err();
    assert!(matches!(err, AgentError::Runtime(_)));
    assert_eq!(platform.invocations(), 2);
}

#[tokio::test]
async fn failing_tool_aborts_the_call() {
    let platform = Arc::new(MockPlatform::new().with_result(ModelResult::tool_calls(vec![
        ToolCall::new("call_1", "weather", Map::new()),
    ])));
    let agent = ChatAgent::builder(platform.clone(), "gpt-4o")
        .processor(ToolProcessor::new(ToolRegistry::new().with(Clock)))
        .build();

    let err = agent.call(hello(), Options::new()).await.unwrap_err();
    assert!(matches!(err, AgentError::Tool(_)));
    assert_eq!(platform.invocations(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Structured output
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, PartialEq, serde::Deserialize, schemars::JsonSchema)]
struct Weather {
    city: String,
    celsius: f64,
}

#[tokio::test]
async fn structured_answers_decode_into_types() {
    let platform = Arc::new(
        MockPlatform::new().with_result(ModelResult::text(r#"{"city": "Oslo", "celsius": -3.5}"#)),
    );
    let agent = ChatAgent::builder(platform.clone(), "gpt-4o")
        .processor(StructuredOutputProcessor::new())
        .build();

    let schema = serde_json::to_value(schemars::schema_for!(Weather)).unwrap();
    let result = agent
        .call(hello(), Options::new().with(Options::RESPONSE_FORMAT, schema))
        .await
        .unwrap();

    assert_eq!(
        result.as_deserialized::<Weather>().unwrap(),
        Weather {
            city: "Oslo".to_string(),
            celsius: -3.5,
        }
    );

    let sent = platform.calls()[0].options.clone();
    let format = sent.response_format().unwrap();
    assert_eq!(format["type"], "json_schema");
    assert_eq!(format["json_schema"]["name"], "Weather");
    assert_eq!(format["json_schema"]["schema"]["additionalProperties"], false);
}
