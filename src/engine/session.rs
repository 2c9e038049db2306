use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::engine::scheduler::{LoopEnd, RoundState, TurnScheduler};
use crate::error::NegotiationError;
use crate::model::context::{SharedContext, DEFAULT_SHARED_GOAL};
use crate::model::interest::InterestProfile;
use crate::model::outcome::{NegotiationOutcome, SessionStatus};
use crate::model::turn::Turn;

pub const DEFAULT_MAX_ROUNDS: u32 = 4;

/// One bilateral negotiation between two interest profiles.
///
/// Owned and driven by a single task; once terminal, the outcome is cached
/// and `run` never calls the scheduler again.
#[derive(Debug)]
pub struct NegotiationSession {
    id: Uuid,
    context: SharedContext,
    transcript: Vec<Turn>,
    round: u32,
    max_rounds: u32,
    status: SessionStatus,
    outcome: Option<NegotiationOutcome>,
}

impl NegotiationSession {
    pub fn new(
        profile_a: InterestProfile,
        profile_b: InterestProfile,
        max_rounds: u32,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            context: SharedContext::new(profile_a, profile_b, goal),
            transcript: Vec::new(),
            round: 0,
            max_rounds,
            status: SessionStatus::InProgress,
            outcome: None,
        }
    }

    pub fn with_defaults(profile_a: InterestProfile, profile_b: InterestProfile) -> Self {
        Self::new(profile_a, profile_b, DEFAULT_MAX_ROUNDS, DEFAULT_SHARED_GOAL)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// The agreed question. Set only when converged.
    pub fn result(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(NegotiationOutcome::question)
    }

    pub fn outcome(&self) -> Option<&NegotiationOutcome> {
        self.outcome.as_ref()
    }

    /// Drives the session to a terminal state.
    pub async fn run(
        &mut self,
        scheduler: &TurnScheduler,
        cancel: &CancellationToken,
    ) -> NegotiationOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        info!(
            session_id = %self.id,
            max_rounds = self.max_rounds,
            model = scheduler.model_id(),
            "negotiation started"
        );

        let end = scheduler
            .drive(
                RoundState {
                    session_id: self.id,
                    context: &self.context,
                    transcript: &mut self.transcript,
                    round: &mut self.round,
                    max_rounds: self.max_rounds,
                },
                cancel,
            )
            .await;

        let outcome = match end {
            LoopEnd::Consensus { question, .. } => NegotiationOutcome::Converged { question },
            LoopEnd::Exhausted => NegotiationOutcome::Exhausted {
                rounds: self.max_rounds,
            },
            LoopEnd::Aborted(NegotiationError::Cancelled) => NegotiationOutcome::Cancelled,
            LoopEnd::Aborted(reason) => NegotiationOutcome::Failed { reason },
        };

        self.finish(outcome.clone());
        outcome
    }

    fn finish(&mut self, outcome: NegotiationOutcome) {
        debug_assert_eq!(self.status, SessionStatus::InProgress);
        self.status = outcome.status();

        info!(
            session_id = %self.id,
            status = ?self.status,
            turns = self.transcript.len(),
            rounds = self.round,
            "negotiation finished"
        );
        self.outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::engine::scheduler::{AdmissionLimiter, RetryPolicy};
    use crate::engine::testing::{MockAgentClient, MockReply};
    use crate::error::UpstreamError;
    use crate::model::turn::Speaker;

    fn scheduler(client: Arc<MockAgentClient>, max_retries: u32) -> TurnScheduler {
        TurnScheduler::new(
            client,
            "test-model",
            RetryPolicy {
                max_retries,
                ..RetryPolicy::none()
            },
            Duration::from_secs(5),
            AdmissionLimiter::new(2),
        )
    }

    fn session(max_rounds: u32) -> NegotiationSession {
        NegotiationSession::new(
            InterestProfile::new("road trips"),
            InterestProfile::new("camping"),
            max_rounds,
            DEFAULT_SHARED_GOAL,
        )
    }

    #[tokio::test]
    async fn converges_on_first_call() {
        let client = Arc::new(MockAgentClient::scripted(vec![MockReply::text(
            "Let's ask: CONSENSUS: What is your favorite trip?",
        )]));
        let scheduler = scheduler(client.clone(), 0);
        let mut session = session(1);

        let outcome = session.run(&scheduler, &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            NegotiationOutcome::Converged {
                question: "What is your favorite trip?".into()
            }
        );
        assert_eq!(session.status(), SessionStatus::Converged);
        assert_eq!(session.result(), Some("What is your favorite trip?"));
        assert_eq!(client.attempts(), 1);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn b_marker_in_third_round_converges_after_six_calls() {
        let mut script: Vec<MockReply> = (0..5).map(|i| MockReply::text(format!("idea {}", i))).collect();
        script.push(MockReply::text("Sounds good.\nCONSENSUS: Where would you go next?"));
        let client = Arc::new(MockAgentClient::scripted(script));
        let scheduler = scheduler(client.clone(), 0);
        let mut session = session(4);

        let outcome = session.run(&scheduler, &CancellationToken::new()).await;

        assert_eq!(outcome.question(), Some("Where would you go next?"));
        assert_eq!(client.attempts(), 6);
        assert_eq!(session.round(), 3);
        let last = session.transcript().last().unwrap();
        assert_eq!(last.speaker, Speaker::B);
        assert_eq!(last.index, 5);
    }

    #[tokio::test]
    async fn no_marker_ends_exhausted_with_explicit_outcome() {
        let client = Arc::new(MockAgentClient::always("maybe something about food?"));
        let scheduler = scheduler(client.clone(), 0);
        let mut session = session(4);

        let outcome = session.run(&scheduler, &CancellationToken::new()).await;

        assert_eq!(outcome, NegotiationOutcome::Exhausted { rounds: 4 });
        assert_eq!(session.status(), SessionStatus::Exhausted);
        assert_eq!(session.result(), None);
        assert_eq!(client.attempts(), 8);
        assert_eq!(session.transcript().len(), 8);
        assert_eq!(session.round(), session.max_rounds());
        assert_eq!(
            outcome.into_result(),
            Err(NegotiationError::RoundBudgetExhausted { max_rounds: 4 })
        );
    }

    #[tokio::test]
    async fn transient_failures_exhaust_retry_budget() {
        let client = Arc::new(MockAgentClient::always_transient("503 Service Unavailable"));
        let scheduler = scheduler(client.clone(), 3);
        let mut session = session(4);

        let outcome = session.run(&scheduler, &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            NegotiationOutcome::Failed {
                reason: NegotiationError::Upstream {
                    source: UpstreamError::transient("503 Service Unavailable"),
                    retries_exhausted: true,
                }
            }
        );
        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.result(), None);
        // one attempt plus three retries, all on the first turn
        assert_eq!(client.attempts(), 4);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn run_is_idempotent_once_terminal() {
        let client = Arc::new(MockAgentClient::scripted(vec![MockReply::text("CONSENSUS: Q")]));
        let scheduler = scheduler(client.clone(), 0);
        let mut session = session(2);

        let first = session.run(&scheduler, &CancellationToken::new()).await;
        let second = session.run(&scheduler, &CancellationToken::new()).await;

        assert_eq!(first, second);
        assert_eq!(client.attempts(), 1);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_calls() {
        let client = Arc::new(MockAgentClient::always("hi"));
        let scheduler = scheduler(client.clone(), 0);
        let mut session = session(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = session.run(&scheduler, &cancel).await;

        assert_eq!(outcome, NegotiationOutcome::Cancelled);
        assert_eq!(session.status(), SessionStatus::Cancelled);
        assert_eq!(client.attempts(), 0);

        // terminal status survives a later, uncancelled run
        let again = session.run(&scheduler, &CancellationToken::new()).await;
        assert_eq!(again, NegotiationOutcome::Cancelled);
        assert_eq!(client.attempts(), 0);
    }

    #[tokio::test]
    async fn zero_round_budget_is_exhausted_immediately() {
        let client = Arc::new(MockAgentClient::always("CONSENSUS: never asked"));
        let scheduler = scheduler(client.clone(), 0);
        let mut session = session(0);

        let outcome = session.run(&scheduler, &CancellationToken::new()).await;

        assert_eq!(outcome, NegotiationOutcome::Exhausted { rounds: 0 });
        assert_eq!(client.attempts(), 0);
    }

    #[test]
    fn new_session_starts_in_progress() {
        let session = NegotiationSession::with_defaults("a".into(), "b".into());
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.round(), 0);
        assert_eq!(session.max_rounds(), DEFAULT_MAX_ROUNDS);
        assert!(session.outcome().is_none());
        assert_eq!(session.context().profile_a.as_str(), "a");
    }
}
