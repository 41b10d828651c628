//! The draft being composed: typed text, voice transcripts, and one image.

use parley_core::types::{Draft, EncodedImage};

/// Owns the single in-progress draft for a session.
///
/// `take_draft_and_reset` is the only way to consume the draft, so a
/// submission can never read it without also clearing it.
#[derive(Debug, Default)]
pub struct Composer {
    draft: Draft,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.draft.text
    }

    pub fn pending_image(&self) -> Option<&EncodedImage> {
        self.draft.pending_image.as_ref()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Non-blank text or an attached image.
    pub fn is_submittable(&self) -> bool {
        self.draft.is_submittable()
    }

    /// Replace the text wholesale (keystrokes).
    pub fn set_text(&mut self, value: impl Into<String>) {
        self.draft.text = value.into();
    }

    /// Append a fragment separated from existing text by a single space
    /// (voice transcripts).
    pub fn append_text(&mut self, fragment: &str) {
        let text = &mut self.draft.text;
        if !text.is_empty() && !text.ends_with(char::is_whitespace) {
            text.push(' ');
        }
        text.push_str(fragment);
    }

    /// Attach an image, returning the one it replaced.
    pub fn attach_image(&mut self, image: EncodedImage) -> Option<EncodedImage> {
        self.draft.pending_image.replace(image)
    }

    /// Drop the pending image; text is untouched.
    pub fn clear_image(&mut self) -> Option<EncodedImage> {
        self.draft.pending_image.take()
    }

    /// Return the current draft and leave an empty one in its place.
    pub fn take_draft_and_reset(&mut self) -> Draft {
        std::mem::take(&mut self.draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(byte: u8) -> EncodedImage {
        EncodedImage::from_bytes("image/png", &[byte; 4]).unwrap()
    }

    #[test]
    fn test_new_composer_is_empty() {
        let composer = Composer::new();
        assert_eq!(composer.text(), "");
        assert!(composer.pending_image().is_none());
        assert!(!composer.is_submittable());
    }

    #[test]
    fn test_set_text_replaces() {
        let mut composer = Composer::new();
        composer.set_text("Hel");
        composer.set_text("Hello");
        assert_eq!(composer.text(), "Hello");
    }

    #[test]
    fn test_append_text_inserts_single_space() {
        let mut composer = Composer::new();
        composer.set_text("Tell me");
        composer.append_text("a joke");
        assert_eq!(composer.text(), "Tell me a joke");
    }

    #[test]
    fn test_append_text_onto_empty_has_no_leading_space() {
        let mut composer = Composer::new();
        composer.append_text("hello there");
        assert_eq!(composer.text(), "hello there");
    }

    #[test]
    fn test_append_text_after_trailing_space() {
        let mut composer = Composer::new();
        composer.set_text("what is ");
        composer.append_text("rust");
        assert_eq!(composer.text(), "what is rust");
    }

    #[test]
    fn test_whitespace_only_text_is_not_submittable() {
        let mut composer = Composer::new();
        composer.set_text("   ");
        assert!(!composer.is_submittable());
    }

    #[test]
    fn test_image_alone_is_submittable() {
        let mut composer = Composer::new();
        composer.attach_image(image(1));
        assert!(composer.is_submittable());
    }

    #[test]
    fn test_attach_image_supersedes_previous() {
        let mut composer = Composer::new();
        assert!(composer.attach_image(image(1)).is_none());
        let replaced = composer.attach_image(image(2));
        assert_eq!(replaced, Some(image(1)));
        assert_eq!(composer.pending_image(), Some(&image(2)));
    }

    #[test]
    fn test_clear_image_keeps_text() {
        let mut composer = Composer::new();
        composer.set_text("caption");
        composer.attach_image(image(1));
        assert_eq!(composer.clear_image(), Some(image(1)));
        assert_eq!(composer.text(), "caption");
        assert!(composer.pending_image().is_none());
    }

    #[test]
    fn test_take_draft_and_reset() {
        let mut composer = Composer::new();
        composer.set_text("Hello");
        composer.attach_image(image(7));

        let draft = composer.take_draft_and_reset();
        assert_eq!(draft.text, "Hello");
        assert_eq!(draft.pending_image, Some(image(7)));

        assert_eq!(composer.text(), "");
        assert!(composer.pending_image().is_none());

        let second = composer.take_draft_and_reset();
        assert!(!second.is_submittable());
    }
}
