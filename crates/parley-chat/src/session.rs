//! The chat session: one owned container for all client state.
//!
//! Front ends hold a `ChatSession`, forward user actions to it, and run a
//! loop that feeds `next_event()` into `handle_event()`. Background work
//! (backend requests, file reads, recognizer callbacks) only ever sends
//! events; every mutation of the composer and log happens here.

use std::path::PathBuf;
use std::sync::Arc;

use parley_core::config::ParleyConfig;
use parley_core::error::Result;
use parley_core::types::{Message, RequestId};

use crate::attachment::AttachmentStore;
use crate::composer::Composer;
use crate::controller::{SubmissionController, SubmissionState};
use crate::event::{self, EventSink, EventStream, SessionEvent};
use crate::gateway::ChatBackend;
use crate::log::ConversationLog;
use crate::speech::{RecognizerOptions, SpeechAdapter, SpeechOutcome, SpeechRecognizer, SpeechState};

pub struct ChatSession {
    composer: Composer,
    log: ConversationLog,
    controller: SubmissionController,
    speech: SpeechAdapter,
    attachments: AttachmentStore,
    events_tx: EventSink,
    events_rx: EventStream,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("composer", &self.composer)
            .field("log_len", &self.log.len())
            .field("controller", &self.controller)
            .field("speech", &self.speech)
            .field("attachments", &self.attachments)
            .finish()
    }
}

impl ChatSession {
    /// Build a session from configuration. The configured greeting, if any,
    /// becomes the first message in the log.
    pub fn new(
        config: &ParleyConfig,
        backend: Arc<dyn ChatBackend>,
        recognizer: Box<dyn SpeechRecognizer>,
    ) -> Self {
        let (events_tx, events_rx) = event::channel();
        let mut log = ConversationLog::new();
        if let Some(greeting) = config.conversation.greeting() {
            log.append(Message::bot(greeting));
        }

        Self {
            composer: Composer::new(),
            log,
            controller: SubmissionController::new(backend, config.backend.error_message.clone()),
            speech: SpeechAdapter::new(
                recognizer,
                RecognizerOptions::new(config.speech.language.clone()),
            ),
            attachments: AttachmentStore::new(config.attachments.max_bytes),
            events_tx,
            events_rx,
        }
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn speech_state(&self) -> SpeechState {
        self.speech.state()
    }

    pub fn speech_supported(&self) -> bool {
        self.speech.is_supported()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.controller.state()
    }

    pub fn is_reading_attachment(&self) -> bool {
        self.attachments.is_reading()
    }

    pub fn set_text(&mut self, value: impl Into<String>) {
        self.composer.set_text(value);
    }

    pub fn append_text(&mut self, fragment: &str) {
        self.composer.append_text(fragment);
    }

    /// Start reading an image file. It is attached once the read completes.
    pub fn select_image(&mut self, path: impl Into<PathBuf>) -> Result<u64> {
        self.attachments.select(path, &self.events_tx)
    }

    /// Remove the pending image and forget any read still in progress.
    pub fn clear_image(&mut self) {
        self.attachments.clear();
        if self.composer.clear_image().is_some() {
            tracing::debug!("Pending image removed");
        }
    }

    /// Start or stop voice input. Returns the new speech state.
    pub fn toggle_voice(&mut self) -> Result<SpeechState> {
        self.speech.toggle(&self.events_tx)
    }

    /// Submit the current draft. `None` when there is nothing to send.
    pub fn submit(&mut self) -> Option<RequestId> {
        self.controller
            .submit(&mut self.composer, &mut self.log, &self.events_tx)
    }

    /// Wait for the next background completion.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Take a background completion if one is already queued.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Apply a background completion.
    ///
    /// Backend failures become a bot message and recognizer errors are only
    /// logged, so the only errors returned here are failed image reads.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Reply { request, result } => {
                self.controller.settle(request, result, &mut self.log);
            }
            SessionEvent::AttachmentRead { token, result } => {
                if let Some(image) = self.attachments.complete(token, result)? {
                    if self.composer.attach_image(image).is_some() {
                        tracing::debug!(token, "Replaced pending image");
                    }
                }
            }
            SessionEvent::Speech { session, event } => {
                if let SpeechOutcome::Transcript(text) = self.speech.handle_event(session, event) {
                    tracing::info!(session, text_len = text.len(), "Voice transcript received");
                    if !text.trim().is_empty() {
                        self.composer.append_text(&text);
                    }
                    self.submit();
                }
            }
        }
        Ok(())
    }

    /// Apply completions until no submission or image read is outstanding.
    ///
    /// Errors from individual events are logged and skipped. A listening
    /// speech session is not waited on.
    pub async fn wait_idle(&mut self) {
        while self.controller.in_flight() > 0 || self.attachments.is_reading() {
            let Some(event) = self.next_event().await else {
                break;
            };
            if let Err(e) = self.handle_event(event) {
                tracing::warn!(error = %e, "Event failed while waiting for idle");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::Sender;

    use crate::gateway::MockBackend;
    use crate::speech::MockRecognizer;

    fn session_with(backend: MockBackend, recognizer: MockRecognizer) -> ChatSession {
        let mut config = ParleyConfig::default();
        config.conversation.greeting = String::new();
        ChatSession::new(&config, Arc::new(backend), Box::new(recognizer))
    }

    #[test]
    fn test_greeting_seeds_log() {
        let session = ChatSession::new(
            &ParleyConfig::default(),
            Arc::new(MockBackend::echo()),
            Box::new(MockRecognizer::new()),
        );
        assert_eq!(session.log().len(), 1);
        let greeting = session.log().last().unwrap();
        assert_eq!(greeting.sender, Sender::Bot);
        assert_eq!(greeting.text, "Hello! How can I help you today?");
    }

    #[test]
    fn test_empty_greeting_leaves_log_empty() {
        let session = session_with(MockBackend::echo(), MockRecognizer::new());
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_submit_and_reply() {
        let mut session = session_with(MockBackend::replying("Hi there!"), MockRecognizer::new());
        session.set_text("Hello");
        assert!(session.submit().is_some());
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.submission_state(), SubmissionState::Submitting);

        session.wait_idle().await;
        assert_eq!(session.log().len(), 2);
        assert_eq!(session.log().messages()[1].text, "Hi there!");
        assert_eq!(session.submission_state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_transcript_is_appended_and_submitted() {
        let backend = MockBackend::echo();
        let recognizer = MockRecognizer::new();
        let mut session = session_with(backend.clone(), recognizer.clone());

        session.set_text("Please");
        assert_eq!(session.toggle_voice().unwrap(), SpeechState::Listening);
        recognizer.say("open the door");

        let event = session.next_event().await.unwrap();
        session.handle_event(event).unwrap();
        assert_eq!(session.speech_state(), SpeechState::Idle);
        assert_eq!(session.log().messages()[0].text, "Please open the door");
        assert_eq!(session.composer().text(), "");

        session.wait_idle().await;
        assert_eq!(backend.received(), vec!["Please open the door"]);
        assert_eq!(session.log().messages()[1].text, "echo: Please open the door");
    }

    #[tokio::test]
    async fn test_recognition_error_does_not_submit() {
        let backend = MockBackend::echo();
        let recognizer = MockRecognizer::new();
        let mut session = session_with(backend.clone(), recognizer.clone());

        session.toggle_voice().unwrap();
        recognizer.emit(crate::speech::RecognitionEvent::Error("no-speech".into()));
        let event = session.next_event().await.unwrap();
        session.handle_event(event).unwrap();

        assert_eq!(session.speech_state(), SpeechState::Idle);
        assert!(session.log().is_empty());
        assert!(backend.received().is_empty());
    }

    #[test]
    fn test_unsupported_voice_is_reported() {
        let mut session = session_with(MockBackend::echo(), MockRecognizer::unsupported());
        assert!(!session.speech_supported());
        assert!(session.toggle_voice().is_err());
        assert_eq!(session.speech_state(), SpeechState::Idle);
    }

    #[tokio::test]
    async fn test_failed_image_read_is_returned() {
        let mut session = session_with(MockBackend::echo(), MockRecognizer::new());
        session.select_image("/nonexistent/photo.png").unwrap();

        let event = session.next_event().await.unwrap();
        assert!(session.handle_event(event).is_err());
        assert!(session.composer().pending_image().is_none());
        assert!(!session.is_reading_attachment());
    }
}
