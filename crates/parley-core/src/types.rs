use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChatError, Result};

// =============================================================================
// Enums
// =============================================================================

/// Who authored a message in the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The person typing, speaking, or attaching images.
    User,
    /// The conversational backend, including synthetic error replies.
    Bot,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "You"),
            Sender::Bot => write!(f, "Bot"),
        }
    }
}

// =============================================================================
// Encoded image
// =============================================================================

/// An image inlined as a `data:<mime>;base64,<payload>` string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Encode raw image bytes under the given MIME type.
    ///
    /// Only `image/*` types are accepted.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Result<Self> {
        if !mime_type.starts_with("image/") {
            return Err(ChatError::UnsupportedImage(format!(
                "{} is not an image type",
                mime_type
            )));
        }
        Ok(Self(format!(
            "data:{};base64,{}",
            mime_type,
            BASE64.encode(bytes)
        )))
    }

    /// Wrap an existing data URL after checking its shape.
    pub fn from_data_url(url: String) -> Result<Self> {
        let (header, payload) = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or_else(|| ChatError::UnsupportedImage("not a data URL".to_string()))?;
        let mime = header.strip_suffix(";base64").ok_or_else(|| {
            ChatError::UnsupportedImage("data URL is not base64 encoded".to_string())
        })?;
        if !mime.starts_with("image/") {
            return Err(ChatError::UnsupportedImage(format!(
                "{} is not an image type",
                mime
            )));
        }
        BASE64
            .decode(payload)
            .map_err(|e| ChatError::UnsupportedImage(format!("invalid base64 payload: {}", e)))?;
        Ok(Self(url))
    }

    /// The MIME type declared in the data URL header.
    pub fn mime_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or_default()
    }

    /// The full data URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payload back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let payload = self.0.split_once(',').map(|(_, p)| p).unwrap_or_default();
        BASE64
            .decode(payload)
            .map_err(|e| ChatError::UnsupportedImage(format!("invalid base64 payload: {}", e)))
    }
}

impl TryFrom<String> for EncodedImage {
    type Error = ChatError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_data_url(value)
    }
}

impl From<EncodedImage> for String {
    fn from(image: EncodedImage) -> Self {
        image.0
    }
}

// =============================================================================
// Conversation records
// =============================================================================

/// One entry in the conversation log. Never mutated after it is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EncodedImage>,
}

impl Message {
    /// A message composed by the user, stamped now.
    pub fn user(text: impl Into<String>, image: Option<EncodedImage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            image,
        }
    }

    /// A reply from the backend (or a synthetic error reply), stamped now.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::Bot,
            timestamp: Utc::now(),
            image: None,
        }
    }
}

/// The in-progress composition: text plus an optional pending image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub pending_image: Option<EncodedImage>,
}

impl Draft {
    /// A draft can be submitted when it has non-blank text or an image.
    pub fn is_submittable(&self) -> bool {
        !self.text.trim().is_empty() || self.pending_image.is_some()
    }
}

/// Identifies one backend request issued by the submission controller.
pub type RequestId = u64;

/// Identifies one speech recognition session.
pub type SpeechSessionId = u64;
