//! Scripted agent client for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::agent_client::{AgentClient, UpstreamError};

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(UpstreamError),
    Delayed(Duration, String),
    Hang,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Error(UpstreamError::transient(message))
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Error(UpstreamError::permanent(message))
    }

    pub fn delayed(delay: Duration, text: impl Into<String>) -> Self {
        Self::Delayed(delay, text.into())
    }

    pub fn hang() -> Self {
        Self::Hang
    }
}

/// Replies from a script, then from `fallback` once the script runs dry.
#[derive(Debug)]
pub struct MockAgentClient {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    prompts: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockAgentClient {
    pub fn scripted(script: Vec<MockReply>) -> Self {
        Self::with_fallback(script, MockReply::text("still thinking"))
    }

    pub fn with_fallback(script: Vec<MockReply>, fallback: MockReply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            prompts: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn always(text: impl Into<String>) -> Self {
        Self::with_fallback(Vec::new(), MockReply::text(text))
    }

    pub fn always_transient(message: impl Into<String>) -> Self {
        Self::with_fallback(Vec::new(), MockReply::transient(message))
    }

    pub fn always_delayed(delay: Duration, text: impl Into<String>) -> Self {
        Self::with_fallback(Vec::new(), MockReply::delayed(delay, text))
    }

    /// Every `generate` invocation, retries included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AgentClient for MockAgentClient {
    async fn generate(&self, prompt: &str, _model_id: &str) -> Result<String, UpstreamError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        match self.next_reply() {
            MockReply::Text(text) => Ok(text),
            MockReply::Error(err) => Err(err),
            MockReply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            MockReply::Hang => std::future::pending().await,
        }
    }
}
