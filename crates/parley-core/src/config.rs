use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Default reply appended when a backend request fails.
pub const DEFAULT_ERROR_MESSAGE: &str = "There was an error processing your request.";

/// Top-level configuration for the Parley client.
///
/// Loaded from `~/.parley/config.toml` by default. Every section is optional;
/// missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub attachments: AttachmentConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Conversational backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Chat endpoint receiving `{"message": ...}` via POST.
    pub endpoint: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Bot message shown when a request fails for any reason.
    pub error_message: String,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/chat".to_string(),
            timeout_secs: 30,
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Speech recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// BCP 47 language tag handed to the recognizer.
    pub language: String,
    /// External speech-to-text command and its arguments. `{lang}` in any
    /// argument is replaced with `language`. Empty disables voice input.
    pub command: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            command: Vec::new(),
        }
    }
}

/// Image attachment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Largest image file accepted, in bytes.
    pub max_bytes: u64,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Conversation presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Bot message that opens every session. Empty disables it.
    pub greeting: String,
}

impl ConversationConfig {
    pub fn greeting(&self) -> Option<&str> {
        let greeting = self.greeting.trim();
        (!greeting.is_empty()).then_some(greeting)
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello! How can I help you today?".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ParleyConfig::default();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.backend.endpoint, "http://127.0.0.1:5000/chat");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.backend.error_message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(config.speech.language, "en-US");
        assert!(config.speech.command.is_empty());
        assert_eq!(config.attachments.max_bytes, 10 * 1024 * 1024);
        assert_eq!(
            config.conversation.greeting(),
            Some("Hello! How can I help you today?")
        );
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[backend]
endpoint = "http://localhost:8080/api/chat"
timeout_secs = 5
error_message = "Something went wrong."

[speech]
language = "fr-FR"
command = ["transcribe", "--lang", "{lang}"]

[attachments]
max_bytes = 2048
"#;
        let file = create_temp_config(content);
        let config = ParleyConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.backend.endpoint, "http://localhost:8080/api/chat");
        assert_eq!(config.backend.timeout(), Duration::from_secs(5));
        assert_eq!(config.backend.error_message, "Something went wrong.");
        assert_eq!(config.speech.language, "fr-FR");
        assert_eq!(config.speech.command, vec!["transcribe", "--lang", "{lang}"]);
        assert_eq!(config.attachments.max_bytes, 2048);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[backend]
timeout_secs = 10
"#;
        let file = create_temp_config(content);
        let config = ParleyConfig::load(file.path()).unwrap();
        assert_eq!(config.backend.timeout_secs, 10);
        // Remaining fields use defaults
        assert_eq!(config.backend.endpoint, "http://127.0.0.1:5000/chat");
        assert_eq!(config.speech.language, "en-US");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = ParleyConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.attachments.max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[backend\nendpoint = ");
        let result = ParleyConfig::load(file.path());
        assert!(matches!(result, Err(crate::ChatError::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ParleyConfig::load_or_default(Path::new("/nonexistent/parley.toml"));
        assert_eq!(config.backend.endpoint, "http://127.0.0.1:5000/chat");
    }

    #[test]
    fn test_blank_greeting_disables_it() {
        let content = r#"
[conversation]
greeting = "   "
"#;
        let file = create_temp_config(content);
        let config = ParleyConfig::load(file.path()).unwrap();
        assert_eq!(config.conversation.greeting(), None);
    }
}
