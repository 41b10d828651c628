//! Line-oriented terminal surface: input commands and message rendering.

use std::path::PathBuf;

use chrono::Local;

use parley_core::types::{Draft, EncodedImage, Message};

pub const HELP: &str = "\
Type a message and press Enter to send it.
  /attach <path>  attach an image to the next message
  /detach         remove the attached image
  /voice          start or stop voice input
  /send           send the current draft (e.g. an image on its own)
  /draft          show the current draft
  /help           show this help
  /quit           exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Plain text: replaces the draft text and submits.
    Text(String),
    Attach(PathBuf),
    Detach,
    Voice,
    Send,
    Draft,
    Help,
    Quit,
    Blank,
    /// A malformed or unknown slash command.
    Invalid(String),
}

impl Input {
    pub fn parse(line: &str) -> Input {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Input::Blank;
        }
        let Some(command) = line.trim_start().strip_prefix('/') else {
            return Input::Text(line.to_string());
        };

        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map(|(n, r)| (n, r.trim()))
            .unwrap_or((command, ""));
        match name {
            "attach" if rest.is_empty() => Input::Invalid("usage: /attach <path>".to_string()),
            "attach" => Input::Attach(PathBuf::from(rest)),
            "detach" => Input::Detach,
            "voice" => Input::Voice,
            "send" => Input::Send,
            "draft" => Input::Draft,
            "help" => Input::Help,
            "quit" | "exit" => Input::Quit,
            other => Input::Invalid(format!("unknown command /{}; try /help", other)),
        }
    }
}

fn image_marker(image: &EncodedImage) -> String {
    format!("[image: {}]", image.mime_type())
}

/// `HH:MM:SS Sender: [image: mime] text`, in local time.
pub fn format_message(message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S");
    let mut line = format!("{} {}:", time, message.sender);
    if let Some(ref image) = message.image {
        line.push(' ');
        line.push_str(&image_marker(image));
    }
    if !message.text.is_empty() {
        line.push(' ');
        line.push_str(&message.text);
    }
    line
}

pub fn format_draft(draft: &Draft) -> String {
    let mut line = format!("Draft: {:?}", draft.text);
    if let Some(ref image) = draft.pending_image {
        line.push(' ');
        line.push_str(&image_marker(image));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(Input::parse("Hello there\n"), Input::Text("Hello there".into()));
        assert_eq!(Input::parse("  "), Input::Blank);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Input::parse("/voice"), Input::Voice);
        assert_eq!(Input::parse("/send"), Input::Send);
        assert_eq!(Input::parse("/detach"), Input::Detach);
        assert_eq!(Input::parse("/draft"), Input::Draft);
        assert_eq!(Input::parse("/help"), Input::Help);
        assert_eq!(Input::parse("/quit"), Input::Quit);
        assert_eq!(
            Input::parse("/attach  ~/Pictures/cat photo.png "),
            Input::Attach(PathBuf::from("~/Pictures/cat photo.png"))
        );
    }

    #[test]
    fn test_parse_invalid_commands() {
        assert!(matches!(Input::parse("/attach"), Input::Invalid(_)));
        assert!(matches!(Input::parse("/frobnicate"), Input::Invalid(_)));
    }

    #[test]
    fn test_format_message() {
        let image = EncodedImage::from_bytes("image/png", b"png").unwrap();
        let line = format_message(&Message::user("look", Some(image)));
        assert!(line.ends_with(" You: [image: image/png] look"), "{}", line);
        assert_eq!(line.len(), "00:00:00 You: [image: image/png] look".len());

        let line = format_message(&Message::bot("Hi there!"));
        assert!(line.ends_with(" Bot: Hi there!"), "{}", line);
    }

    #[test]
    fn test_format_draft() {
        let draft = Draft {
            text: "half a thought".into(),
            pending_image: Some(EncodedImage::from_bytes("image/gif", b"gif").unwrap()),
        };
        assert_eq!(
            format_draft(&draft),
            "Draft: \"half a thought\" [image: image/gif]"
        );
    }
}
