//! Routing a conversation to one of several agents.

use crate::agent::Agent;
use crate::error::AgentError;
use async_trait::async_trait;
use lodestar_models::{Message, MessageBag, Options};
use lodestar_platform::{ModelResult, ResultKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

/// A routing rule: send the conversation to `to` when it is about any of
/// the `when` topics.
#[derive(Clone)]
pub struct Handoff {
    to: Arc<dyn Agent>,
    when: Vec<String>,
}

impl Handoff {
    /// Creates a handoff to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] if `when` is empty.
    pub fn new<S: Into<String>>(
        to: Arc<dyn Agent>,
        when: impl IntoIterator<Item = S>,
    ) -> Result<Self, AgentError> {
        let when: Vec<String> = when.into_iter().map(Into::into).collect();
        if when.is_empty() {
            return Err(AgentError::invalid_argument(
                "Handoff must have at least one \"when\" condition",
            ));
        }
        Ok(Self { to, when })
    }

    /// Returns the target agent.
    #[must_use]
    pub fn to(&self) -> &Arc<dyn Agent> {
        &self.to
    }

    /// Returns the trigger topics.
    #[must_use]
    pub fn when(&self) -> &[String] {
        &self.when
    }
}

impl core::fmt::Debug for Handoff {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handoff")
            .field("to", &self.to.name())
            .field("when", &self.when)
            .finish()
    }
}

/// The orchestrator's routing answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Name of the agent that should answer, or empty for the fallback.
    pub agent_name: String,
    /// Why this agent was chosen.
    pub reasoning: String,
}

impl Decision {
    /// Creates a decision.
    #[must_use]
    pub fn new(agent_name: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            reasoning: reasoning.into(),
        }
    }

    /// Returns whether a target agent was named.
    #[must_use]
    pub fn has_agent(&self) -> bool {
        !self.agent_name.is_empty()
    }
}

/// An agent that lets an orchestrator pick which agent answers.
///
/// On each call the orchestrator is asked, with `response_format` set to the
/// [`Decision`] schema, which handoff target fits the last user message.
///
/// - An object result that decodes to a [`Decision`] naming a configured
///   target sends the original conversation and options to that target.
/// - A [`Decision`] with an empty or unknown name goes to the fallback.
/// - Any other result means the orchestrator answered by itself; it is called
///   again with the original conversation and options and that answer is
///   returned.
///
/// The routing `response_format` never reaches the chosen agent. Targets are
/// matched in configuration order by exact name.
pub struct MultiAgent {
    name: String,
    orchestrator: Arc<dyn Agent>,
    handoffs: Vec<Handoff>,
    fallback: Arc<dyn Agent>,
}

impl MultiAgent {
    /// Default agent name.
    pub const DEFAULT_NAME: &'static str = "multi-agent";

    /// Creates a router.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] if `handoffs` is empty.
    pub fn new(
        orchestrator: Arc<dyn Agent>,
        handoffs: Vec<Handoff>,
        fallback: Arc<dyn Agent>,
    ) -> Result<Self, AgentError> {
        if handoffs.is_empty() {
            return Err(AgentError::invalid_argument(
                "MultiAgent requires at least 1 handoff.",
            ));
        }
        Ok(Self {
            name: Self::DEFAULT_NAME.to_string(),
            orchestrator,
            handoffs,
            fallback,
        })
    }

    /// Sets the agent's name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the configured handoffs.
    #[must_use]
    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    /// Returns the fallback agent.
    #[must_use]
    pub fn fallback(&self) -> &Arc<dyn Agent> {
        &self.fallback
    }

    fn selection_prompt(&self, query: &str) -> String {
        let mut prompt = String::from(
            "You are an intelligent agent orchestrator. Based on the user's question, \
             determine which specialized agent should handle the request.\n\n",
        );
        let _ = writeln!(prompt, "User question: \"{query}\"\n");
        prompt.push_str("Available agents:\n");
        for handoff in &self.handoffs {
            let _ = writeln!(prompt, "- {}: {}", handoff.to.name(), handoff.when.join(", "));
        }
        let _ = writeln!(
            prompt,
            "\nFallback agent: {} (handles general questions and anything no other agent covers)\n",
            self.fallback.name()
        );
        prompt.push_str(
            "Answer with the exact name of the best agent in \"agentName\" and a short \
             \"reasoning\". Leave \"agentName\" empty if none of the agents fits.",
        );
        prompt
    }

    fn target(&self, decision: &Decision) -> Option<&Arc<dyn Agent>> {
        if !decision.has_agent() {
            return None;
        }
        self.handoffs
            .iter()
            .find(|handoff| handoff.to.name() == decision.agent_name)
            .map(|handoff| &handoff.to)
    }
}

fn as_decision(result: &ModelResult) -> Option<Decision> {
    match result.kind() {
        ResultKind::Object(value) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}

#[async_trait]
impl Agent for MultiAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, messages: MessageBag, options: Options) -> Result<ModelResult, AgentError> {
        let query = messages
            .user_message()
            .ok_or_else(|| AgentError::runtime("No user message found in conversation."))?
            .text()
            .unwrap_or_default();

        let schema = serde_json::to_value(schemars::schema_for!(Decision))?;
        let routing_options = options.clone().with(Options::RESPONSE_FORMAT, schema);
        let routing_messages = MessageBag::new().with(Message::user(self.selection_prompt(&query)));

        let answer = self.orchestrator.call(routing_messages, routing_options).await?;

        let Some(decision) = as_decision(&answer) else {
            tracing::debug!(
                agent = %self.name,
                orchestrator = self.orchestrator.name(),
                kind = answer.kind().name(),
                "Orchestrator answered without a decision, asking it directly"
            );
            return self.orchestrator.call(messages, options).await;
        };
        tracing::debug!(
            agent = %self.name,
            target = %decision.agent_name,
            reasoning = %decision.reasoning,
            "Decision received"
        );

        let target = match self.target(&decision) {
            Some(target) => {
                tracing::debug!(agent = %self.name, target = target.name(), "Target selected");
                target
            }
            None => {
                tracing::debug!(
                    agent = %self.name,
                    requested = %decision.agent_name,
                    fallback = self.fallback.name(),
                    "Using fallback agent"
                );
                &self.fallback
            }
        };

        tracing::debug!(agent = %self.name, target = target.name(), "Dispatching conversation");
        target.call(messages, options).await
    }
}

impl core::fmt::Debug for MultiAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MultiAgent")
            .field("name", &self.name)
            .field("orchestrator", &self.orchestrator.name())
            .field("handoffs", &self.handoffs)
            .field("fallback", &self.fallback.name())
            .finish()
    }
}
