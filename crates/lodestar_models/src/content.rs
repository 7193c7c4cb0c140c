//! Content parts of a user message.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// A single content part of a user message.
///
/// Binary payloads are stored base64-encoded so messages stay serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// An inline image.
    Image {
        /// Base64-encoded image bytes.
        data: String,
        /// MIME type, e.g. `image/png`.
        media_type: String,
    },
    /// An image referenced by URL.
    ImageUrl {
        /// The image location.
        url: String,
    },
    /// Inline audio.
    Audio {
        /// Base64-encoded audio bytes.
        data: String,
        /// Audio format, e.g. `mp3` or `wav`.
        format: String,
    },
    /// An inline document.
    File {
        /// Base64-encoded file bytes.
        data: String,
        /// MIME type, e.g. `application/pdf`.
        media_type: String,
        /// Optional file name shown to the model.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Content {
    /// Creates a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates an image part from base64-encoded data.
    #[must_use]
    pub fn image_base64(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self::Image {
            data: data.into(),
            media_type: media_type.into(),
        }
    }

    /// Creates an image part from raw bytes.
    #[must_use]
    pub fn image_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self::image_base64(STANDARD.encode(bytes), media_type)
    }

    /// Creates an image part referenced by URL.
    #[must_use]
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::ImageUrl { url: url.into() }
    }

    /// Creates an audio part from base64-encoded data.
    #[must_use]
    pub fn audio_base64(data: impl Into<String>, format: impl Into<String>) -> Self {
        Self::Audio {
            data: data.into(),
            format: format.into(),
        }
    }

    /// Creates a document part from raw bytes.
    #[must_use]
    pub fn file_bytes(
        bytes: &[u8],
        media_type: impl Into<String>,
        name: Option<String>,
    ) -> Self {
        Self::File {
            data: STANDARD.encode(bytes),
            media_type: media_type.into(),
            name,
        }
    }

    /// Returns the text if this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns a `data:` URL for inline binary parts.
    #[must_use]
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::Image { data, media_type } | Self::File {
                data, media_type, ..
            } => Some(format!("data:{media_type};base64,{data}")),
            _ => None,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_bytes_are_base64_encoded() {
        let content = Content::image_bytes(b"png", "image/png");
        assert_eq!(
            content.data_url().as_deref(),
            Some("data:image/png;base64,cG5n")
        );
    }

    #[test]
    fn only_text_parts_have_text() {
        assert_eq!(Content::text("hi").as_text(), Some("hi"));
        assert_eq!(Content::image_url("https://x/y.png").as_text(), None);
    }
}
