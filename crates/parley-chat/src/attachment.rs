//! Image attachment store: reads a user-selected image file into a data URL.
//!
//! Reads run on the tokio runtime and report back as
//! `SessionEvent::AttachmentRead`. Each selection gets a token; only the
//! completion carrying the newest token is accepted, so a slow read for an
//! earlier selection can never overwrite a later one.

use std::path::{Path, PathBuf};

use parley_core::error::{ChatError, Result};
use parley_core::types::EncodedImage;

use crate::event::{EventSink, SessionEvent};

/// Map a file extension to an image MIME type.
pub fn image_mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        _ => return None,
    };
    Some(mime)
}

/// Read an image file and encode it as a data URL.
///
/// Files larger than `max_bytes` are rejected before reading.
pub async fn read_image(path: &Path, max_bytes: u64) -> Result<EncodedImage> {
    let mime = image_mime_for_path(path)
        .ok_or_else(|| ChatError::UnsupportedImage(path.display().to_string()))?;

    let size = tokio::fs::metadata(path).await?.len();
    if size > max_bytes {
        return Err(ChatError::ImageTooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await?;
    EncodedImage::from_bytes(mime, &bytes)
}

/// Tracks the in-progress image read, if any.
#[derive(Debug)]
pub struct AttachmentStore {
    max_bytes: u64,
    next_token: u64,
    pending: Option<u64>,
}

impl AttachmentStore {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            next_token: 0,
            pending: None,
        }
    }

    /// Whether a selection is still being read.
    pub fn is_reading(&self) -> bool {
        self.pending.is_some()
    }

    /// Begin reading `path`. The result arrives later under the returned token.
    ///
    /// Files that are not images by extension are rejected immediately and do
    /// not disturb a read already in progress.
    pub fn select(&mut self, path: impl Into<PathBuf>, events: &EventSink) -> Result<u64> {
        let path = path.into();
        if image_mime_for_path(&path).is_none() {
            tracing::warn!(path = %path.display(), "Ignoring non-image file");
            return Err(ChatError::UnsupportedImage(path.display().to_string()));
        }

        self.next_token += 1;
        let token = self.next_token;
        if let Some(previous) = self.pending.replace(token) {
            tracing::debug!(previous, token, "Superseding pending image read");
        }

        tracing::info!(token, path = %path.display(), "Reading image attachment");
        let max_bytes = self.max_bytes;
        let events = events.clone();
        tokio::spawn(async move {
            let result = read_image(&path, max_bytes).await;
            if events
                .send(SessionEvent::AttachmentRead { token, result })
                .is_err()
            {
                tracing::debug!(token, "Session closed before image read finished");
            }
        });

        Ok(token)
    }

    /// Accept a finished read.
    ///
    /// Returns `Ok(None)` for a stale token, `Ok(Some(image))` when the latest
    /// selection succeeded, and the read error when it failed.
    pub fn complete(&mut self, token: u64, result: Result<EncodedImage>) -> Result<Option<EncodedImage>> {
        if self.pending != Some(token) {
            tracing::debug!(token, pending = ?self.pending, "Discarding stale image read");
            return Ok(None);
        }
        self.pending = None;

        match result {
            Ok(image) => {
                tracing::debug!(token, mime = image.mime_type(), "Image attachment ready");
                Ok(Some(image))
            }
            Err(e) => {
                tracing::warn!(token, error = %e, "Image attachment failed");
                Err(e)
            }
        }
    }

    /// Forget any in-progress read so its completion is discarded.
    pub fn clear(&mut self) {
        if let Some(token) = self.pending.take() {
            tracing::debug!(token, "Cancelled pending image read");
        }
    }
}
