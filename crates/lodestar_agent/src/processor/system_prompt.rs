use super::{Input, InputProcessor};
use crate::error::AgentError;
use async_trait::async_trait;
use lodestar_models::Message;

/// Prepends a system message to conversations that have none.
///
/// A conversation that already carries system instructions is left as is.
#[derive(Debug, Clone)]
pub struct SystemPromptProcessor {
    prompt: String,
}

impl SystemPromptProcessor {
    /// Creates a processor adding `prompt` as system instructions.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// Returns the instructions.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[async_trait]
impl InputProcessor for SystemPromptProcessor {
    async fn process_input(&self, input: &mut Input) -> Result<(), AgentError> {
        if input.messages.system_message().is_some() {
            tracing::debug!("Conversation already has a system message");
            return Ok(());
        }
        input.messages.prepend(Message::system(self.prompt.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_models::catalog::{FallbackModelCatalog, ModelCatalog};
    use lodestar_models::{MessageBag, Options, Role};

    async fn input(messages: MessageBag) -> Input {
        Input {
            model: FallbackModelCatalog::new().model("any").await.unwrap(),
            messages,
            options: Options::new(),
        }
    }

    #[tokio::test]
    async fn adds_instructions_in_front() {
        let mut input = input(MessageBag::new().with(Message::user("hi"))).await;
        SystemPromptProcessor::new("Be brief.")
            .process_input(&mut input)
            .await
            .unwrap();

        assert_eq!(input.messages.len(), 2);
        assert_eq!(input.messages.messages()[0], Message::system("Be brief."));
    }

    #[tokio::test]
    async fn never_adds_a_second_system_message() {
        let mut input = input(
            MessageBag::new()
                .with(Message::system("Existing."))
                .with(Message::user("hi")),
        )
        .await;
        let processor = SystemPromptProcessor::new("Be brief.");
        processor.process_input(&mut input).await.unwrap();
        processor.process_input(&mut input).await.unwrap();

        let systems = input
            .messages
            .iter()
            .filter(|message| message.role() == Role::System)
            .count();
        assert_eq!(systems, 1);
        assert_eq!(input.messages.system_message().and_then(Message::text).unwrap(), "Existing.");
    }
}
