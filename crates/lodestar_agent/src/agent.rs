//! The agent abstraction and the processor-driven chat agent.

use crate::error::AgentError;
use crate::processor::{Input, InputProcessor, Output, OutputProcessor};
use async_trait::async_trait;
use lodestar_models::{MessageBag, Options};
use lodestar_platform::{ModelResult, Platform, RequestInput};
use std::sync::{Arc, Weak};

/// Something that answers a conversation.
///
/// Implementations must be `Send + Sync` so they can be shared between
/// routers, processors and concurrent callers.
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    /// Returns the agent's name, used for routing and tracing.
    ///
    /// Defaults to the type name.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Answers `messages`.
    ///
    /// # Errors
    ///
    /// Returns an error if a processor or the platform call fails.
    async fn call(&self, messages: MessageBag, options: Options) -> Result<ModelResult, AgentError>;
}

#[async_trait]
impl<A: Agent + ?Sized> Agent for Arc<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn call(&self, messages: MessageBag, options: Options) -> Result<ModelResult, AgentError> {
        (**self).call(messages, options).await
    }
}

/// An agent that sends the conversation to one model through a [`Platform`].
///
/// A call runs in four steps, strictly in sequence:
///
/// 1. The model name is resolved through the platform's catalog and an
///    [`Input`] is built.
/// 2. Every input processor runs over the [`Input`], in registration order.
/// 3. The platform is invoked and its result converted.
/// 4. Every output processor runs over the [`Output`], in registration order,
///    and the final result is returned.
///
/// # Example
///
/// ```
/// use lodestar_agent::{Agent, ChatAgent, SystemPromptProcessor};
/// use lodestar_platform::RoutingPlatform;
/// use std::sync::Arc;
///
/// let platform = Arc::new(RoutingPlatform::builder().build());
/// let agent = ChatAgent::builder(platform, "gpt-4o-mini")
///     .name("support")
///     .input_processor(SystemPromptProcessor::new("You answer support questions."))
///     .build();
///
/// assert_eq!(agent.name(), "support");
/// ```
pub struct ChatAgent {
    name: String,
    model: String,
    platform: Arc<dyn Platform>,
    input_processors: Vec<Arc<dyn InputProcessor>>,
    output_processors: Vec<Arc<dyn OutputProcessor>>,
}

impl ChatAgent {
    /// Starts building an agent calling `model` through `platform`.
    ///
    /// # Arguments
    ///
    /// * `platform` - The platform requests are sent through.
    /// * `model` - Model name, optionally with inline options
    ///   (`gpt-4o?temperature=0.2`).
    #[must_use]
    pub fn builder(platform: Arc<dyn Platform>, model: impl Into<String>) -> ChatAgentBuilder {
        ChatAgentBuilder {
            name: None,
            model: model.into(),
            platform,
            input_processors: Vec::new(),
            output_processors: Vec::new(),
        }
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, messages: MessageBag, options: Options) -> Result<ModelResult, AgentError> {
        let model = self.platform.model_catalog().model(&self.model).await?;
        let mut input = Input {
            model,
            messages,
            options,
        };

        for (index, processor) in self.input_processors.iter().enumerate() {
            tracing::debug!(agent = %self.name, index, "Running input processor");
            processor.process_input(&mut input).await?;
        }

        let Input {
            model,
            messages,
            options,
        } = input;

        tracing::debug!(
            agent = %self.name,
            model = model.name(),
            messages = messages.len(),
            "Calling model"
        );
        let request_options = options.merged_over(model.options());
        let result = self
            .platform
            .invoke(
                model.name(),
                RequestInput::Messages(messages.clone()),
                request_options,
            )
            .await?
            .into_result()
            .await?;

        let mut output = Output {
            model,
            result,
            messages,
            options,
        };
        for (index, processor) in self.output_processors.iter().enumerate() {
            tracing::debug!(agent = %self.name, index, "Running output processor");
            processor.process_output(&mut output).await?;
        }

        Ok(output.result)
    }
}

impl core::fmt::Debug for ChatAgent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChatAgent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("input_processors", &self.input_processors.len())
            .field("output_processors", &self.output_processors.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ChatAgent`].
pub struct ChatAgentBuilder {
    name: Option<String>,
    model: String,
    platform: Arc<dyn Platform>,
    input_processors: Vec<Arc<dyn InputProcessor>>,
    output_processors: Vec<Arc<dyn OutputProcessor>>,
}

impl ChatAgentBuilder {
    /// Sets the agent's name. Defaults to the model name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends an input processor.
    #[must_use]
    pub fn input_processor(mut self, processor: impl InputProcessor) -> Self {
        self.input_processors.push(Arc::new(processor));
        self
    }

    /// Appends an output processor.
    #[must_use]
    pub fn output_processor(mut self, processor: impl OutputProcessor) -> Self {
        self.output_processors.push(Arc::new(processor));
        self
    }

    /// Appends a processor to both stages.
    ///
    /// The same instance runs as input and as output processor.
    #[must_use]
    pub fn processor<P: InputProcessor + OutputProcessor>(mut self, processor: P) -> Self {
        let processor = Arc::new(processor);
        self.input_processors.push(Arc::clone(&processor) as Arc<dyn InputProcessor>);
        self.output_processors.push(processor);
        self
    }

    /// Builds the agent and attaches it to every agent-aware processor.
    #[must_use]
    pub fn build(self) -> Arc<ChatAgent> {
        let Self {
            name,
            model,
            platform,
            input_processors,
            output_processors,
        } = self;

        Arc::new_cyclic(|weak: &Weak<ChatAgent>| {
            let agent: Weak<dyn Agent> = weak.clone();
            let aware = input_processors
                .iter()
                .filter_map(|processor| processor.agent_aware())
                .chain(
                    output_processors
                        .iter()
                        .filter_map(|processor| processor.agent_aware()),
                );
            for processor in aware {
                processor.set_agent(agent.clone());
            }

            ChatAgent {
                name: name.unwrap_or_else(|| model.clone()),
                model,
                platform,
                input_processors,
                output_processors,
            }
        })
    }
}

impl core::fmt::Debug for ChatAgentBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChatAgentBuilder")
            .field("name", &self.name)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
