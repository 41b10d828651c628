//! Chat client core for Parley.
//!
//! Provides the composer, conversation log, submission controller, speech
//! input adapter, image attachment store, and backend gateway, all owned by a
//! single `ChatSession`.

pub mod attachment;
pub mod composer;
pub mod controller;
pub mod event;
pub mod gateway;
pub mod log;
pub mod session;
pub mod speech;

pub use attachment::{image_mime_for_path, read_image, AttachmentStore};
pub use composer::Composer;
pub use controller::{SubmissionController, SubmissionState};
pub use event::SessionEvent;
pub use gateway::{ChatBackend, HttpBackend, MockBackend};
pub use log::ConversationLog;
pub use session::ChatSession;
pub use speech::{
    MockRecognizer, RecognitionEvent, RecognitionResult, RecognizerOptions, SpeechAdapter,
    SpeechOutcome, SpeechRecognizer, SpeechSink, SpeechState,
};
