//! Tool calling.

use super::{AgentAware, AgentSlot, Input, InputProcessor, Output, OutputProcessor};
use crate::agent::Agent;
use crate::error::AgentError;
use async_trait::async_trait;
use indexmap::IndexMap;
use lodestar_models::{Message, MessageBag, Role, Tool, ToolCall};
use lodestar_platform::ResultKind;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};

/// The tools an agent may call.
#[async_trait]
pub trait Toolbox: Send + Sync + 'static {
    /// Returns the descriptors sent to the model.
    fn tools(&self) -> Vec<Tool>;

    /// Runs a tool call and returns its output as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown or fails.
    async fn execute(&self, call: &ToolCall) -> Result<String, AgentError>;
}

/// A single callable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    /// Returns the tool's descriptor.
    fn definition(&self) -> Tool;

    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails.
    async fn call(&self, arguments: &Map<String, Value>) -> Result<String, AgentError>;
}

/// A [`Toolbox`] of named [`ToolHandler`]s, in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Registers a tool.
    ///
    /// # Panics
    ///
    /// Panics if a tool with the same name is already registered.
    pub fn register(&mut self, tool: impl ToolHandler) {
        let name = tool.definition().name;
        assert!(
            !self.tools.contains_key(&name),
            "Tool '{name}' is already registered"
        );
        self.tools.insert(name, Arc::new(tool));
    }

    /// Registers a tool, builder style.
    ///
    /// # Panics
    ///
    /// Panics if a tool with the same name is already registered.
    #[must_use]
    pub fn with(mut self, tool: impl ToolHandler) -> Self {
        self.register(tool);
        self
    }

    /// Returns whether a tool with the given name is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the names of all registered tools.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

#[async_trait]
impl Toolbox for ToolRegistry {
    fn tools(&self) -> Vec<Tool> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    async fn execute(&self, call: &ToolCall) -> Result<String, AgentError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| AgentError::tool(format!("unknown tool '{}'", call.name)))?;
        tool.call(&call.arguments).await
    }
}

impl core::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Runs the tool-calling loop for an agent.
///
/// The input stage advertises the toolbox's tools in `options.tools`. When
/// the model answers with tool calls, the output stage runs every call,
/// appends the assistant turn and one reply per call to the conversation,
/// and calls the owning agent again with it. The agent's final answer
/// replaces the tool-call result.
///
/// Rounds are counted from the assistant tool-call turns that follow the
/// last user message; past `max_iterations` the call fails.
///
/// Register the processor as both input and output processor, for example
/// with [`ChatAgentBuilder::processor`](crate::ChatAgentBuilder::processor).
pub struct ToolProcessor {
    toolbox: Arc<dyn Toolbox>,
    max_iterations: usize,
    agent: AgentSlot,
}

impl ToolProcessor {
    /// Default bound on tool-calling rounds per user turn.
    pub const DEFAULT_MAX_ITERATIONS: usize = 10;

    /// Creates a processor for `toolbox`.
    #[must_use]
    pub fn new(toolbox: impl Toolbox) -> Self {
        Self::shared(Arc::new(toolbox))
    }

    /// Creates a processor for a shared toolbox.
    #[must_use]
    pub fn shared(toolbox: Arc<dyn Toolbox>) -> Self {
        Self {
            toolbox,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            agent: AgentSlot::new(),
        }
    }

    /// Sets the bound on tool-calling rounds.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Returns whether the processor is attached to an agent.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.agent.is_set()
    }
}

fn completed_rounds(messages: &MessageBag) -> usize {
    messages
        .iter()
        .rev()
        .take_while(|message| message.role() != Role::User)
        .filter(|message| matches!(message, Message::Assistant { tool_calls, .. } if !tool_calls.is_empty()))
        .count()
}

impl AgentAware for ToolProcessor {
    fn set_agent(&self, agent: Weak<dyn Agent>) {
        if !self.agent.set(agent) {
            tracing::debug!("Tool processor already attached, keeping the first agent");
        }
    }
}

#[async_trait]
impl InputProcessor for ToolProcessor {
    async fn process_input(&self, input: &mut Input) -> Result<(), AgentError> {
        let tools = self.toolbox.tools();
        if tools.is_empty() {
            return Ok(());
        }
        input.options.set_tools(&tools)?;
        Ok(())
    }

    fn agent_aware(&self) -> Option<&dyn AgentAware> {
        Some(self)
    }
}

#[async_trait]
impl OutputProcessor for ToolProcessor {
    async fn process_output(&self, output: &mut Output) -> Result<(), AgentError> {
        let ResultKind::ToolCalls(calls) = output.result.kind() else {
            return Ok(());
        };

        let rounds = completed_rounds(&output.messages);
        if rounds >= self.max_iterations {
            return Err(AgentError::runtime(format!(
                "tool calling did not finish within {} iterations",
                self.max_iterations
            )));
        }

        let agent = self
            .agent
            .get()
            .ok_or_else(|| AgentError::runtime("tool processor is not attached to an agent"))?;

        let calls = calls.clone();
        let mut messages = output.messages.clone();
        messages.push(Message::assistant_tool_calls(calls.clone()));
        for call in calls {
            tracing::debug!(tool = %call.name, id = %call.id, round = rounds + 1, "Executing tool call");
            let reply = self.toolbox.execute(&call).await?;
            messages.push(Message::tool_call(call, reply));
        }

        output.result = agent.call(messages, output.options.clone()).await?;
        Ok(())
    }

    fn agent_aware(&self) -> Option<&dyn AgentAware> {
        Some(self)
    }
}

impl core::fmt::Debug for ToolProcessor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ToolProcessor")
            .field("tools", &self.toolbox.tools().len())
            .field("max_iterations", &self.max_iterations)
            .field("agent", &self.agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

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

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn definition(&self) -> Tool {
            Tool::new("echo", "Repeats its input")
                .with_parameters(json!({"type": "object", "properties": {"text": {"type": "string"}}}))
        }

        async fn call(&self, arguments: &Map<String, Value>) -> Result<String, AgentError> {
            arguments
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AgentError::tool("missing 'text'"))
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let registry = ToolRegistry::new().with(Clock).with(Echo);
        assert_eq!(registry.names(), ["clock", "echo"]);

        let mut arguments = Map::new();
        arguments.insert("text".to_string(), json!("hi"));
        let reply = registry
            .execute(&ToolCall::new("1", "echo", arguments))
            .await
            .unwrap();
        assert_eq!(reply, "hi");

        let err = registry
            .execute(&ToolCall::new("2", "weather", Map::new()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "tool error: unknown tool 'weather'");
    }

    #[test]
    #[should_panic(expected = "Tool 'clock' is already registered")]
    fn duplicate_names_panic() {
        let _ = ToolRegistry::new().with(Clock).with(Clock);
    }

    #[test]
    fn rounds_are_counted_since_the_last_user_turn() {
        let call = ToolCall::new("1", "clock", Map::new());
        let messages = MessageBag::new()
            .with(Message::user("time?"))
            .with(Message::assistant_tool_calls(vec![call.clone()]))
            .with(Message::tool_call(call.clone(), "12:00"))
            .with(Message::assistant("It is noon."))
            .with(Message::user("and now?"))
            .with(Message::assistant_tool_calls(vec![call.clone()]))
            .with(Message::tool_call(call, "12:01"));

        assert_eq!(completed_rounds(&messages), 1);
    }
}
