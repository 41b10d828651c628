//! Backend gateway: the request/response shim to the conversational service.
//!
//! Provides the `ChatBackend` trait, the HTTP implementation used by the
//! application, and a `MockBackend` for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use parley_core::config::BackendConfig;
use parley_core::error::{ChatError, Result};

/// A conversational service that answers one message with one reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the user's text and return the reply text.
    ///
    /// Any failure (transport, timeout, status, payload) is an `Err`.
    async fn send(&self, message: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatReplyBody {
    response: String,
}

/// Talks to the chat service over HTTP: `POST {"message"}` -> `{"response"}`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport_error(err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Backend(err.to_string())
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send(&self, message: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequestBody { message })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::BackendStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let reply: ChatReplyBody = serde_json::from_slice(&body)
            .map_err(|e| ChatError::MalformedResponse(e.to_string()))?;
        Ok(reply.response)
    }
}

// =============================================================================
// Mock
// =============================================================================

#[derive(Debug, Clone)]
enum MockReply {
    Fixed(String),
    Echo,
    Fail,
}

#[derive(Debug)]
struct MockInner {
    reply: MockReply,
    delays: Mutex<HashMap<String, Duration>>,
    received: Mutex<Vec<String>>,
}

/// In-process backend with scripted replies.
///
/// Clones share state, so a test can keep one handle and inspect what the
/// session sent.
#[derive(Debug, Clone)]
pub struct MockBackend {
    inner: Arc<MockInner>,
}

impl MockBackend {
    fn with_reply(reply: MockReply) -> Self {
        Self {
            inner: Arc::new(MockInner {
                reply,
                delays: Mutex::new(HashMap::new()),
                received: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Always answers with `text`.
    pub fn replying(text: &str) -> Self {
        Self::with_reply(MockReply::Fixed(text.to_string()))
    }

    /// Answers with `echo: <message>`.
    pub fn echo() -> Self {
        Self::with_reply(MockReply::Echo)
    }

    /// Every request fails as if the network were down.
    pub fn failing() -> Self {
        Self::with_reply(MockReply::Fail)
    }

    /// Hold the reply to `message` for `delay` before answering.
    pub fn delay_for(self, message: &str, delay: Duration) -> Self {
        lock(&self.inner.delays).insert(message.to_string(), delay);
        self
    }

    /// Every message received so far, in arrival order.
    pub fn received(&self) -> Vec<String> {
        lock(&self.inner.received).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn send(&self, message: &str) -> Result<String> {
        lock(&self.inner.received).push(message.to_string());

        let delay = lock(&self.inner.delays).get(message).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match &self.inner.reply {
            MockReply::Fixed(text) => Ok(text.clone()),
            MockReply::Echo => Ok(format!("echo: {}", message)),
            MockReply::Fail => Err(ChatError::Backend("connection refused".to_string())),
        }
    }
}
