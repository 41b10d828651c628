//! Speech input adapter with a strict Idle/Listening state machine.
//!
//! Valid transitions:
//! - Idle -> Listening (toggle, recognizer started)
//! - Listening -> Idle (toggle, result, error, or end of session)
//!
//! The platform recognizer is hidden behind `SpeechRecognizer`; its callbacks
//! arrive as typed `RecognitionEvent`s tagged with the session that produced
//! them. Only the first terminal event of the active session counts.

use std::fmt;
use std::sync::{Arc, Mutex};

use parley_core::error::{ChatError, Result};
use parley_core::types::SpeechSessionId;

use crate::event::{EventSink, SessionEvent};

/// Whether a recognition session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechState {
    /// No recognition session. Ready to start.
    Idle,
    /// A recognition session is capturing speech.
    Listening,
}

impl fmt::Display for SpeechState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechState::Idle => write!(f, "Idle"),
            SpeechState::Listening => write!(f, "Listening"),
        }
    }
}

impl SpeechState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SpeechState) -> bool {
        matches!(
            (self, target),
            (SpeechState::Idle, SpeechState::Listening) | (SpeechState::Listening, SpeechState::Idle)
        )
    }
}

/// One recognition result with its ranked alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub alternatives: Vec<String>,
    pub is_final: bool,
}

impl RecognitionResult {
    /// A final result with a single alternative.
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            alternatives: vec![text.into()],
            is_final: true,
        }
    }
}

/// What a platform recognizer can report for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Recognition produced results.
    Result(Vec<RecognitionResult>),
    /// Recognition failed with a platform error code.
    Error(String),
    /// The session closed.
    End,
}

/// Settings handed to the recognizer when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerOptions {
    /// BCP 47 language tag.
    pub language: String,
    /// Always false: only final results are surfaced.
    pub interim_results: bool,
}

impl RecognizerOptions {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            interim_results: false,
        }
    }
}

/// Where a recognizer sends events for the session it was started with.
#[derive(Debug, Clone)]
pub struct SpeechSink {
    session: SpeechSessionId,
    events: EventSink,
}

impl SpeechSink {
    pub fn new(session: SpeechSessionId, events: EventSink) -> Self {
        Self { session, events }
    }

    pub fn session(&self) -> SpeechSessionId {
        self.session
    }

    /// Deliver an event. Returns false once the session owner has gone away.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        self.events
            .send(SessionEvent::Speech {
                session: self.session,
                event,
            })
            .is_ok()
    }
}

/// A platform speech-recognition capability.
pub trait SpeechRecognizer: Send {
    /// Whether recognition can work at all on this platform.
    fn is_supported(&self) -> bool;

    /// Begin capturing. Events for this session go to `sink`.
    ///
    /// An error here means capture never started.
    fn start(&mut self, options: &RecognizerOptions, sink: SpeechSink) -> Result<()>;

    /// Cancel capture for `session`. Need not produce a result.
    fn stop(&mut self, session: SpeechSessionId);
}

/// What handling a recognizer event meant for the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// The session produced a final result. The transcript may be blank;
    /// the draft is submitted either way.
    Transcript(String),
    /// The session ended without a transcript.
    Ended,
    /// The session ended with a recognition error.
    Failed(String),
    /// The event was stale, for another session, or not terminal.
    Ignored,
}

/// Drives one recognizer through Idle/Listening sessions.
pub struct SpeechAdapter {
    recognizer: Box<dyn SpeechRecognizer>,
    options: RecognizerOptions,
    state: SpeechState,
    active: Option<SpeechSessionId>,
    next_session: SpeechSessionId,
}

impl fmt::Debug for SpeechAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechAdapter")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("active", &self.active)
            .field("supported", &self.recognizer.is_supported())
            .finish()
    }
}

impl SpeechAdapter {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>, options: RecognizerOptions) -> Self {
        Self {
            recognizer,
            options,
            state: SpeechState::Idle,
            active: None,
            next_session: 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_supported()
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == SpeechState::Listening
    }

    /// The session currently listening, if any.
    pub fn active_session(&self) -> Option<SpeechSessionId> {
        self.active
    }

    fn transition(&mut self, target: SpeechState) -> Result<()> {
        if self.state.can_transition_to(&target) {
            tracing::debug!("Speech state: {} -> {}", self.state, target);
            self.state = target;
            Ok(())
        } else {
            Err(ChatError::Speech(format!(
                "Invalid state transition: {} -> {}",
                self.state, target
            )))
        }
    }

    /// Start a recognition session. Illegal while already listening.
    ///
    /// If the capability is absent or the recognizer fails to start, the
    /// adapter stays Idle.
    pub fn start(&mut self, events: &EventSink) -> Result<SpeechSessionId> {
        if self.state == SpeechState::Listening {
            return Err(ChatError::SpeechAlreadyActive);
        }
        if !self.recognizer.is_supported() {
            tracing::warn!("Speech recognition is not supported on this platform");
            return Err(ChatError::SpeechUnsupported);
        }

        let session = self.next_session + 1;
        self.recognizer
            .start(&self.options, SpeechSink::new(session, events.clone()))?;
        self.next_session = session;
        self.transition(SpeechState::Listening)?;
        self.active = Some(session);
        tracing::info!(session, language = %self.options.language, "Speech session started");
        Ok(session)
    }

    /// Cancel the active session.
    pub fn stop(&mut self) -> Result<()> {
        let session = self.active.ok_or(ChatError::SpeechNotActive)?;
        self.recognizer.stop(session);
        self.finish()?;
        tracing::info!(session, "Speech session cancelled");
        Ok(())
    }

    /// Start when Idle, stop when Listening. Returns the new state.
    pub fn toggle(&mut self, events: &EventSink) -> Result<SpeechState> {
        match self.state {
            SpeechState::Idle => {
                self.start(events)?;
            }
            SpeechState::Listening => self.stop()?,
        }
        Ok(self.state)
    }

    fn finish(&mut self) -> Result<()> {
        self.transition(SpeechState::Idle)?;
        self.active = None;
        Ok(())
    }

    /// Apply a recognizer event.
    ///
    /// The first terminal event of the active session moves the adapter to
    /// Idle; anything else is ignored.
    pub fn handle_event(&mut self, session: SpeechSessionId, event: RecognitionEvent) -> SpeechOutcome {
        if self.active != Some(session) {
            tracing::debug!(session, ?event, "Ignoring event for inactive speech session");
            return SpeechOutcome::Ignored;
        }

        let outcome = match event {
            RecognitionEvent::Result(results) => {
                // Only the first result counts, and only once it is final.
                let Some(first) = results.into_iter().next().filter(|r| r.is_final) else {
                    return SpeechOutcome::Ignored;
                };
                SpeechOutcome::Transcript(first.alternatives.into_iter().next().unwrap_or_default())
            }
            RecognitionEvent::Error(code) => {
                tracing::warn!(session, error = %code, "Speech recognition error");
                SpeechOutcome::Failed(code)
            }
            RecognitionEvent::End => SpeechOutcome::Ended,
        };

        if let Err(e) = self.finish() {
            tracing::warn!(session, error = %e, "Speech state machine out of sync");
            self.state = SpeechState::Idle;
            self.active = None;
        }
        tracing::debug!(session, ?outcome, "Speech session finished");
        outcome
    }
}

// =============================================================================
// Mock
// =============================================================================

#[derive(Debug)]
struct MockRecognizerState {
    supported: bool,
    fail_start: bool,
    sink: Option<SpeechSink>,
    starts: Vec<(SpeechSessionId, RecognizerOptions)>,
    stops: Vec<SpeechSessionId>,
}

/// Scriptable recognizer for tests.
///
/// Clones share state: hand one to the adapter and keep one to emit events
/// and inspect calls.
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    inner: Arc<Mutex<MockRecognizerState>>,
}

impl MockRecognizer {
    fn with(supported: bool, fail_start: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRecognizerState {
                supported,
                fail_start,
                sink: None,
                starts: Vec::new(),
                stops: Vec::new(),
            })),
        }
    }

    pub fn new() -> Self {
        Self::with(true, false)
    }

    /// A platform without speech recognition.
    pub fn unsupported() -> Self {
        Self::with(false, false)
    }

    /// Supported, but every start fails (e.g. microphone busy).
    pub fn failing_start() -> Self {
        Self::with(true, true)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockRecognizerState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Emit an event for the most recently started session.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        let sink = self.state().sink.clone();
        sink.map(|s| s.emit(event)).unwrap_or(false)
    }

    /// Emit a single final transcript for the most recent session.
    pub fn say(&self, text: &str) -> bool {
        self.emit(RecognitionEvent::Result(vec![RecognitionResult::final_text(text)]))
    }

    pub fn last_session(&self) -> Option<SpeechSessionId> {
        self.state().sink.as_ref().map(SpeechSink::session)
    }

    pub fn start_count(&self) -> usize {
        self.state().starts.len()
    }

    pub fn stops(&self) -> Vec<SpeechSessionId> {
        self.state().stops.clone()
    }

    pub fn last_options(&self) -> Option<RecognizerOptions> {
        self.state().starts.last().map(|(_, o)| o.clone())
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn is_supported(&self) -> bool {
        self.state().supported
    }

    fn start(&mut self, options: &RecognizerOptions, sink: SpeechSink) -> Result<()> {
        let mut state = self.state();
        if state.fail_start {
            return Err(ChatError::Speech("microphone unavailable".to_string()));
        }
        state.starts.push((sink.session(), options.clone()));
        state.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self, session: SpeechSessionId) {
        self.state().stops.push(session);
    }
}
