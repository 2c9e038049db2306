use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{RetrySettings, Settings};
use crate::engine::agent_client::{AgentClient, UpstreamError};
use crate::engine::consensus_parser::parse_consensus;
use crate::engine::prompt_builder::{PromptBuilder, RoleDirective};
use crate::error::NegotiationError;
use crate::model::context::SharedContext;
use crate::model::turn::{Speaker, Turn};

/// Bounded retry with exponential backoff for transient upstream failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based), with up to 25% jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);

        let jitter_ms = (delay.as_millis() / 4) as u64;
        if jitter_ms == 0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        (delay + Duration::from_millis(jitter)).min(self.max_delay.max(delay))
    }
}

/// Caps model calls in flight across all sessions sharing it.
/// Callers over the cap wait for a slot instead of failing.
#[derive(Debug, Clone)]
pub struct AdmissionLimiter {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().acquire_owned().await.ok()
    }
}

/// How the round loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEnd {
    Consensus { question: String, speaker: Speaker },
    Exhausted,
    Aborted(NegotiationError),
}

/// Mutable negotiation state the scheduler advances.
pub struct RoundState<'a> {
    pub session_id: Uuid,
    pub context: &'a SharedContext,
    pub transcript: &'a mut Vec<Turn>,
    pub round: &'a mut u32,
    pub max_rounds: u32,
}

/// Drives the alternating A/B round loop for one session at a time.
/// One scheduler can be shared by any number of sessions.
pub struct TurnScheduler {
    client: Arc<dyn AgentClient>,
    model_id: String,
    retry: RetryPolicy,
    call_timeout: Duration,
    limiter: AdmissionLimiter,
}

impl TurnScheduler {
    pub fn new(
        client: Arc<dyn AgentClient>,
        model_id: impl Into<String>,
        retry: RetryPolicy,
        call_timeout: Duration,
        limiter: AdmissionLimiter,
    ) -> Self {
        Self {
            client,
            model_id: model_id.into(),
            retry,
            call_timeout,
            limiter,
        }
    }

    pub fn from_settings(client: Arc<dyn AgentClient>, settings: &Settings) -> Self {
        Self::new(
            client,
            settings.agent.model_id.clone(),
            RetryPolicy::from(&settings.retry),
            settings.negotiation.call_timeout(),
            AdmissionLimiter::new(settings.max_concurrent_calls),
        )
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Runs rounds until a marker is seen, the budget runs out, or a call fails.
    /// Turns are appended to the transcript in call order.
    pub async fn drive(&self, state: RoundState<'_>, cancel: &CancellationToken) -> LoopEnd {
        let RoundState {
            session_id,
            context,
            transcript,
            round,
            max_rounds,
        } = state;

        while *round < max_rounds {
            let current = *round;
            *round += 1;

            for speaker in [Speaker::A, Speaker::B] {
                let directive = RoleDirective::for_turn(speaker, current);
                let prompt = PromptBuilder::build(context, speaker, directive, transcript.last());

                let response = match self.call_with_retry(session_id, &prompt, cancel).await {
                    Ok(text) => text,
                    Err(err) => return LoopEnd::Aborted(err),
                };

                let index = transcript.len();
                debug_assert_eq!(Speaker::for_index(index), speaker);
                debug!(%session_id, round = current, %speaker, index, "turn recorded");

                let question = parse_consensus(&response);
                transcript.push(Turn {
                    index,
                    speaker,
                    prompt,
                    response,
                });

                if let Some(question) = question {
                    return LoopEnd::Consensus { question, speaker };
                }
            }
        }

        LoopEnd::Exhausted
    }

    async fn call_with_retry(
        &self,
        session_id: Uuid,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, NegotiationError> {
        let mut retry = 0;
        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NegotiationError::Cancelled),
                result = self.call_once(prompt) => result,
            };

            let err = match result {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            if !err.is_transient() {
                warn!(%session_id, error = %err, "permanent upstream failure");
                return Err(NegotiationError::Upstream {
                    source: err,
                    retries_exhausted: false,
                });
            }
            if retry >= self.retry.max_retries {
                warn!(%session_id, attempts = retry + 1, error = %err, "retry budget exhausted");
                return Err(NegotiationError::Upstream {
                    source: err,
                    retries_exhausted: true,
                });
            }

            retry += 1;
            let delay = self.retry.backoff(retry);
            warn!(%session_id, attempt = retry, ?delay, error = %err, "transient upstream failure, retrying");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(NegotiationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One attempt: wait for an admission slot, then call with a timeout.
    /// The slot is released as soon as the call settles.
    async fn call_once(&self, prompt: &str) -> Result<String, UpstreamError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .ok_or_else(|| UpstreamError::permanent("admission limiter closed"))?;

        match tokio::time::timeout(self.call_timeout, self.client.generate(prompt, &self.model_id))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::transient(format!(
                "model call timed out after {:?}",
                self.call_timeout
            ))),
        }
    }
}
