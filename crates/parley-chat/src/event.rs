//! Completions delivered back to the session by background work.

use tokio::sync::mpsc;

use parley_core::error::Result;
use parley_core::types::{EncodedImage, RequestId, SpeechSessionId};

use crate::speech::RecognitionEvent;

/// Something that finished outside the session's own task.
///
/// Backend replies, file reads, and recognizer callbacks all arrive here and
/// are applied one at a time by `ChatSession::handle_event`.
#[derive(Debug)]
pub enum SessionEvent {
    /// A backend request settled.
    Reply {
        request: RequestId,
        result: Result<String>,
    },
    /// An image file finished reading.
    AttachmentRead { token: u64, result: Result<EncodedImage> },
    /// The speech recognizer reported something for one of its sessions.
    Speech {
        session: SpeechSessionId,
        event: RecognitionEvent,
    },
}

/// Sending half of the session's event queue.
pub type EventSink = mpsc::UnboundedSender<SessionEvent>;

/// Receiving half of the session's event queue.
pub type EventStream = mpsc::UnboundedReceiver<SessionEvent>;

pub fn channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}
