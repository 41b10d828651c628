use thiserror::Error;

/// Top-level error type for the Parley client.
///
/// Backend variants never reach the rendering layer: the submission
/// controller turns them into a bot message. Speech and attachment variants
/// are returned to the front end so it can show a notice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Backend responded with status {0}")]
    BackendStatus(u16),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Backend request timed out")]
    Timeout,

    #[error("Voice recognition is not supported on this platform")]
    SpeechUnsupported,

    #[error("Voice recognition is already active")]
    SpeechAlreadyActive,

    #[error("Voice recognition is not active")]
    SpeechNotActive,

    #[error("Voice recognition error: {0}")]
    Speech(String),

    #[error("Unsupported image file: {0}")]
    UnsupportedImage(String),

    #[error("Image too large: {size} bytes exceeds {limit} bytes")]
    ImageTooLarge { size: u64, limit: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Whether this error came from talking to the conversational backend.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            ChatError::Backend(_)
                | ChatError::BackendStatus(_)
                | ChatError::MalformedResponse(_)
                | ChatError::Timeout
        )
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        ChatError::Config(err.to_string())
    }
}

/// A specialized `Result` type for Parley operations.
pub type Result<T> = std::result::Result<T, ChatError>;
