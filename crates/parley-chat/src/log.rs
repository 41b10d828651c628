//! Append-only conversation log.

use parley_core::types::{Message, Sender};

/// Ordered record of every message in the session.
///
/// Append order is display order. Entries are never edited, removed,
/// reordered, or deduplicated.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index.
    pub fn append(&mut self, message: Message) -> usize {
        tracing::debug!(
            index = self.messages.len(),
            sender = ?message.sender,
            text_len = message.text.len(),
            has_image = message.image.is_some(),
            "Message appended"
        );
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Messages appended at or after `index`; empty when `index` is past the end.
    ///
    /// Front ends keep a cursor and render `since(cursor)` after each update.
    pub fn since(&self, index: usize) -> &[Message] {
        self.messages.get(index..).unwrap_or_default()
    }

    /// Number of messages from the given sender.
    pub fn count_from(&self, sender: Sender) -> usize {
        self.messages.iter().filter(|m| m.sender == sender).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_log_is_empty() {
        let log = ConversationLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(log.last().is_none());
    }

    #[test]
    fn test_append_preserves_order() {
        let mut log = ConversationLog::new();
        assert_eq!(log.append(Message::user("one", None)), 0);
        assert_eq!(log.append(Message::bot("two")), 1);
        assert_eq!(log.append(Message::user("three", None)), 2);

        let texts: Vec<&str> = log.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(log.last().unwrap().text, "three");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut log = ConversationLog::new();
        log.append(Message::user("same", None));
        log.append(Message::user("same", None));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_since() {
        let mut log = ConversationLog::new();
        log.append(Message::user("a", None));
        log.append(Message::bot("b"));
        log.append(Message::bot("c"));

        assert_eq!(log.since(0).len(), 3);
        assert_eq!(log.since(1)[0].text, "b");
        assert!(log.since(3).is_empty());
        assert!(log.since(42).is_empty());
    }

    #[test]
    fn test_count_from() {
        let mut log = ConversationLog::new();
        log.append(Message::bot("greeting"));
        log.append(Message::user("hi", None));
        log.append(Message::bot("hello"));
        assert_eq!(log.count_from(Sender::User), 1);
        assert_eq!(log.count_from(Sender::Bot), 2);
    }
}
