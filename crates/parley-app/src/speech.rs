//! Speech recognition backed by an external speech-to-text command.
//!
//! The command records from the microphone and prints its transcript to
//! stdout, one alternative per line, best first. Stopping a session kills the
//! process.

use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::oneshot;

use parley_chat::speech::{
    RecognitionEvent, RecognitionResult, RecognizerOptions, SpeechRecognizer, SpeechSink,
};
use parley_core::error::{ChatError, Result};
use parley_core::types::SpeechSessionId;

/// Placeholder replaced with the recognizer language in command arguments.
const LANGUAGE_PLACEHOLDER: &str = "{lang}";

/// Runs a configured command per recognition session.
#[derive(Debug)]
pub struct CommandRecognizer {
    command: Vec<String>,
    running: Option<(SpeechSessionId, oneshot::Sender<()>)>,
}

impl CommandRecognizer {
    /// An empty command means voice input is unsupported.
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            running: None,
        }
    }
}

/// Split the configured command into program and arguments, substituting the
/// language tag.
fn expand_command(command: &[String], language: &str) -> Option<(String, Vec<String>)> {
    let (program, args) = command.split_first()?;
    if program.trim().is_empty() {
        return None;
    }
    let args = args
        .iter()
        .map(|arg| arg.replace(LANGUAGE_PLACEHOLDER, language))
        .collect();
    Some((program.clone(), args))
}

/// Non-blank stdout lines, trimmed, in order.
fn transcript_alternatives(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl SpeechRecognizer for CommandRecognizer {
    fn is_supported(&self) -> bool {
        self.command
            .first()
            .is_some_and(|program| !program.trim().is_empty())
    }

    fn start(&mut self, options: &RecognizerOptions, sink: SpeechSink) -> Result<()> {
        let (program, args) =
            expand_command(&self.command, &options.language).ok_or(ChatError::SpeechUnsupported)?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ChatError::Speech("no async runtime available".to_string()));
        }

        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ChatError::Speech(format!("failed to start {}: {}", program, e)))?;

        let session = sink.session();
        tracing::debug!(session, program = %program, ?args, "Speech command started");

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.running = Some((session, cancel_tx));

        tokio::spawn(async move {
            tokio::select! {
                output = child.wait_with_output() => {
                    let event = match output {
                        Ok(output) if output.status.success() => {
                            let alternatives = transcript_alternatives(&output.stdout);
                            if alternatives.is_empty() {
                                RecognitionEvent::Error("no-speech".to_string())
                            } else {
                                RecognitionEvent::Result(vec![RecognitionResult {
                                    alternatives,
                                    is_final: true,
                                }])
                            }
                        }
                        Ok(output) => {
                            tracing::debug!(
                                session,
                                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                                "Speech command failed"
                            );
                            RecognitionEvent::Error(format!("command exited with {}", output.status))
                        }
                        Err(e) => RecognitionEvent::Error(e.to_string()),
                    };
                    sink.emit(event);
                    sink.emit(RecognitionEvent::End);
                }
                _ = cancel_rx => {
                    tracing::debug!(session, "Speech command cancelled");
                }
            }
        });

        Ok(())
    }

    fn stop(&mut self, session: SpeechSessionId) {
        match self.running.take() {
            Some((running, cancel)) if running == session => {
                // The receiver is gone if the command already finished.
                let _ = cancel.send(());
            }
            other => self.running = other,
        }
    }
}
