//! The closed set of model capabilities.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// A feature a [`Model`](crate::Model) advertises.
///
/// Capabilities are plain tags: transports, converters and processors consult
/// them to decide whether a request can be served, never to change how it is
/// served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Accepts plain text input.
    InputText,
    /// Accepts a structured conversation.
    InputMessages,
    /// Accepts several inputs in one call (batch embeddings).
    InputMultiple,
    /// Accepts image content.
    InputImage,
    /// Accepts audio content.
    InputAudio,
    /// Accepts PDF documents.
    InputPdf,
    /// Produces text.
    OutputText,
    /// Produces a token stream.
    OutputStreaming,
    /// Honors a response schema.
    OutputStructured,
    /// Produces images.
    OutputImage,
    /// Produces audio.
    OutputAudio,
    /// Emits tool calls.
    ToolCalling,
    /// Synthesizes speech from text.
    TextToSpeech,
    /// Transcribes speech to text.
    SpeechToText,
    /// Produces embedding vectors.
    Embeddings,
    /// Emits reasoning content.
    Thinking,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: &'static [Capability] = &[
        Capability::InputText,
        Capability::InputMessages,
        Capability::InputMultiple,
        Capability::InputImage,
        Capability::InputAudio,
        Capability::InputPdf,
        Capability::OutputText,
        Capability::OutputStreaming,
        Capability::OutputStructured,
        Capability::OutputImage,
        Capability::OutputAudio,
        Capability::ToolCalling,
        Capability::TextToSpeech,
        Capability::SpeechToText,
        Capability::Embeddings,
        Capability::Thinking,
    ];

    /// Returns the kebab-case tag used in catalog documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputText => "input-text",
            Self::InputMessages => "input-messages",
            Self::InputMultiple => "input-multiple",
            Self::InputImage => "input-image",
            Self::InputAudio => "input-audio",
            Self::InputPdf => "input-pdf",
            Self::OutputText => "output-text",
            Self::OutputStreaming => "output-streaming",
            Self::OutputStructured => "output-structured",
            Self::OutputImage => "output-image",
            Self::OutputAudio => "output-audio",
            Self::ToolCalling => "tool-calling",
            Self::TextToSpeech => "text-to-speech",
            Self::SpeechToText => "speech-to-text",
            Self::Embeddings => "embeddings",
            Self::Thinking => "thinking",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|capability| capability.as_str() == s)
            .ok_or_else(|| format!("unknown capability: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>(), Ok(*capability));
        }
    }

    #[test]
    fn serde_uses_kebab_case_tags() {
        let json = serde_json::to_string(&Capability::OutputStructured).unwrap();
        assert_eq!(json, "\"output-structured\"");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!("telepathy".parse::<Capability>().is_err());
    }
}
