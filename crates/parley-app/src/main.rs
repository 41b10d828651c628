//! Parley terminal client - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Initialize tracing (stderr, so the conversation on stdout stays clean)
//! 3. Build the HTTP backend and the command-based speech recognizer
//! 4. Run the session loop: stdin lines and background completions

mod cli;
mod console;
mod speech;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use parley_chat::{ChatSession, HttpBackend, SpeechState};
use parley_core::config::ParleyConfig;

use crate::cli::CliArgs;
use crate::console::Input;
use crate::speech::CommandRecognizer;

/// Print every message appended since `cursor` and return the new cursor.
fn print_new_messages(session: &ChatSession, cursor: usize) -> usize {
    for message in session.log().since(cursor) {
        println!("{}", console::format_message(message));
    }
    session.log().len()
}

fn notice(text: impl std::fmt::Display) {
    println!("* {}", text);
}

/// Apply one line of input. Returns false when the user asked to quit.
fn apply_input(session: &mut ChatSession, input: Input) -> bool {
    match input {
        Input::Text(text) => {
            session.set_text(text);
            session.submit();
        }
        Input::Send => {
            if session.submit().is_none() {
                notice("Nothing to send.");
            }
        }
        Input::Attach(path) => match session.select_image(&path) {
            Ok(_) => notice(format!("Reading {}...", path.display())),
            Err(e) => notice(e),
        },
        Input::Detach => session.clear_image(),
        Input::Voice => match session.toggle_voice() {
            Ok(SpeechState::Listening) => notice("Listening..."),
            Ok(SpeechState::Idle) => notice("Voice input stopped."),
            Err(e) => notice(e),
        },
        Input::Draft => println!("{}", console::format_draft(session.composer().draft())),
        Input::Help => println!("{}", console::HELP),
        Input::Invalid(message) => notice(message),
        Input::Blank => {}
        Input::Quit => return false,
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so the log level can come from it.
    let config_file = args.resolve_config_path();
    let (mut config, config_error) = match ParleyConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (ParleyConfig::default(), Some(e)),
    };

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    match config_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
    }

    config.backend.endpoint = args.resolve_endpoint(&config.backend.endpoint);
    config.speech.language = args.resolve_language(&config.speech.language);

    // Backend and speech.
    let backend = HttpBackend::from_config(&config.backend)?;
    tracing::info!(endpoint = %backend.endpoint(), "Chat backend configured");
    let recognizer = CommandRecognizer::new(config.speech.command.clone());

    let mut session = ChatSession::new(&config, Arc::new(backend), Box::new(recognizer));
    if !session.speech_supported() {
        tracing::info!("No speech command configured; voice input disabled");
    }

    println!("Parley. Type /help for commands.");
    let mut cursor = print_new_messages(&session, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !apply_input(&mut session, Input::parse(&line)) {
                            break;
                        }
                    }
                    None => {
                        // Input closed: let outstanding replies land, then exit.
                        session.wait_idle().await;
                        cursor = print_new_messages(&session, cursor);
                        break;
                    }
                }
            }
            Some(event) = session.next_event() => {
                if let Err(e) = session.handle_event(event) {
                    notice(e);
                }
            }
        }
        cursor = print_new_messages(&session, cursor);
    }

    tracing::debug!(messages = cursor, "Parley exiting");
    Ok(())
}
