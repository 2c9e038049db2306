//! Icebreaker matching backend: two model-backed agents negotiate one shared
//! question from two parties' interest profiles.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;

pub use engine::agent_client::{AgentClient, HttpAgentClient};
pub use engine::consensus_parser::{parse_consensus, CONSENSUS_MARKER};
pub use engine::prompt_builder::{PromptBuilder, RoleDirective};
pub use engine::scheduler::{AdmissionLimiter, RetryPolicy, TurnScheduler};
pub use engine::session::{NegotiationSession, DEFAULT_MAX_ROUNDS};
pub use error::{NegotiationError, UpstreamError, UpstreamErrorKind};
pub use model::interest::InterestProfile;
pub use model::outcome::{NegotiationOutcome, SessionStatus};
pub use model::turn::{Speaker, Turn};
