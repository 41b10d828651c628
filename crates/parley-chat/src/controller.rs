//! Submission controller: turns a draft into a user message and a backend
//! request, then turns the settled request into a bot message.
//!
//! Flow of one submission:
//! 1. Ineligible drafts are ignored.
//! 2. The draft is taken (and cleared) from the composer.
//! 3. The user message is appended before any network I/O.
//! 4. The text is sent to the backend on a spawned task.
//! 5. The reply, or the fixed error message, is appended when it arrives.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parley_core::error::{ChatError, Result};
use parley_core::types::{Message, RequestId};

use crate::composer::Composer;
use crate::event::{EventSink, SessionEvent};
use crate::gateway::ChatBackend;
use crate::log::ConversationLog;

/// Whether any submission is waiting on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionState {
    Idle,
    Submitting,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::Idle => write!(f, "Idle"),
            SubmissionState::Submitting => write!(f, "Submitting"),
        }
    }
}

/// Issues backend requests and reconciles their replies with the log.
///
/// Submissions are independent: a second one may start while the first is
/// still in flight, and replies are appended in the order they settle.
pub struct SubmissionController {
    backend: Arc<dyn ChatBackend>,
    error_message: String,
    next_request: RequestId,
    in_flight: HashSet<RequestId>,
    last_settled: Option<RequestId>,
}

impl fmt::Debug for SubmissionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionController")
            .field("error_message", &self.error_message)
            .field("next_request", &self.next_request)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl SubmissionController {
    pub fn new(backend: Arc<dyn ChatBackend>, error_message: impl Into<String>) -> Self {
        Self {
            backend,
            error_message: error_message.into(),
            next_request: 0,
            in_flight: HashSet::new(),
            last_settled: None,
        }
    }

    pub fn state(&self) -> SubmissionState {
        if self.in_flight.is_empty() {
            SubmissionState::Idle
        } else {
            SubmissionState::Submitting
        }
    }

    /// Number of requests that have not settled yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Submit the composer's draft.
    ///
    /// Returns `None` (and touches nothing) when the draft is ineligible.
    /// Otherwise the draft is consumed, the user message is appended, and the
    /// request is spawned on the current tokio runtime; its outcome arrives
    /// later as `SessionEvent::Reply`.
    pub fn submit(
        &mut self,
        composer: &mut Composer,
        log: &mut ConversationLog,
        events: &EventSink,
    ) -> Option<RequestId> {
        if !composer.is_submittable() {
            tracing::debug!("Ignoring submission of an empty draft");
            return None;
        }

        let draft = composer.take_draft_and_reset();
        self.next_request += 1;
        let request = self.next_request;

        // The image stays local; only the text goes to the backend.
        log.append(Message::user(draft.text.clone(), draft.pending_image));
        self.in_flight.insert(request);

        tracing::info!(
            request_id = request,
            text_len = draft.text.len(),
            in_flight = self.in_flight.len(),
            "Submitting message"
        );

        let backend = Arc::clone(&self.backend);
        let events = events.clone();
        let text = draft.text;
        tokio::spawn(async move {
            let result = match tokio::spawn(async move { backend.send(&text).await }).await {
                Ok(result) => result,
                Err(e) => Err(ChatError::Backend(format!("request task failed: {}", e))),
            };
            if events.send(SessionEvent::Reply { request, result }).is_err() {
                tracing::debug!(request_id = request, "Session closed before reply arrived");
            }
        });

        Some(request)
    }

    /// Apply a settled request: append the reply, or the error message.
    ///
    /// Unknown or already-settled request ids are ignored.
    pub fn settle(&mut self, request: RequestId, result: Result<String>, log: &mut ConversationLog) {
        if !self.in_flight.remove(&request) {
            tracing::warn!(request_id = request, "Ignoring reply for unknown request");
            return;
        }

        if self.last_settled.is_some_and(|last| request < last) {
            tracing::debug!(
                request_id = request,
                "Reply arrived after a later request had settled"
            );
        }
        self.last_settled = Some(self.last_settled.map_or(request, |last| last.max(request)));

        match result {
            Ok(reply) => {
                tracing::info!(request_id = request, reply_len = reply.len(), "Reply received");
                log.append(Message::bot(reply));
            }
            Err(e) => {
                tracing::warn!(request_id = request, error = %e, "Backend request failed");
                log.append(Message::bot(self.error_message.clone()));
            }
        }
    }
}
