//! CLI argument definitions for the Parley terminal client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Parley: chat with a conversational backend from the terminal.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Chat endpoint URL.
    #[arg(short = 'e', long = "endpoint")]
    pub endpoint: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Speech recognition language tag, e.g. en-US.
    #[arg(long = "language")]
    pub language: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the chat endpoint.
    ///
    /// Priority: --endpoint flag > PARLEY_ENDPOINT env var > config file value.
    pub fn resolve_endpoint(&self, config_endpoint: &str) -> String {
        self.resolve_endpoint_with(std::env::var("PARLEY_ENDPOINT").ok(), config_endpoint)
    }

    fn resolve_endpoint_with(&self, env_endpoint: Option<String>, config_endpoint: &str) -> String {
        if let Some(ref e) = self.endpoint {
            return e.clone();
        }
        match env_endpoint {
            Some(e) if !e.trim().is_empty() => e,
            _ => config_endpoint.to_string(),
        }
    }

    /// Resolve the log level: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Resolve the recognizer language: --language flag > config file value.
    pub fn resolve_language(&self, config_language: &str) -> String {
        self.language
            .clone()
            .unwrap_or_else(|| config_language.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("parley").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_flags() {
        let args = parse(&[
            "--config",
            "/tmp/parley.toml",
            "-e",
            "http://localhost:9000/chat",
            "--log-level",
            "debug",
            "--language",
            "de-DE",
        ]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/parley.toml"));
        assert_eq!(
            args.resolve_endpoint_with(Some("http://env/chat".into()), "http://config/chat"),
            "http://localhost:9000/chat"
        );
        assert_eq!(args.resolve_log_level("warn"), "debug");
        assert_eq!(args.resolve_language("en-US"), "de-DE");
    }

    #[test]
    fn test_env_endpoint_beats_config() {
        let args = parse(&[]);
        assert_eq!(
            args.resolve_endpoint_with(Some("http://env/chat".into()), "http://config/chat"),
            "http://env/chat"
        );
        assert_eq!(
            args.resolve_endpoint_with(Some("  ".into()), "http://config/chat"),
            "http://config/chat"
        );
        assert_eq!(
            args.resolve_endpoint_with(None, "http://config/chat"),
            "http://config/chat"
        );
    }

    #[test]
    fn test_config_values_used_without_flags() {
        let args = parse(&[]);
        assert_eq!(args.resolve_log_level("warn"), "warn");
        assert_eq!(args.resolve_language("en-US"), "en-US");
    }

    #[test]
    fn test_default_config_path_file_name() {
        let path = default_config_path();
        assert!(path.ends_with("config.toml"));
    }
}
