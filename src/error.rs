use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamErrorKind {
    /// Network, timeout, rate-limit, 5xx. Worth retrying.
    Transient,
    /// Auth, unknown model, malformed request or response.
    Permanent,
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamErrorKind::Transient => f.write_str("transient"),
            UpstreamErrorKind::Permanent => f.write_str("permanent"),
        }
    }
}

/// Failure reported by an [`AgentClient`](crate::engine::agent_client::AgentClient).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} upstream error: {message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
}

impl UpstreamError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == UpstreamErrorKind::Transient
    }
}

/// Why a negotiation did not produce a question.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum NegotiationError {
    #[error("{}", upstream_reason(.source, .retries_exhausted))]
    Upstream {
        source: UpstreamError,
        retries_exhausted: bool,
    },

    #[error("no consensus reached after {max_rounds} rounds")]
    RoundBudgetExhausted { max_rounds: u32 },

    #[error("negotiation cancelled")]
    Cancelled,
}

impl NegotiationError {
    /// Short category name used when mapping to a transport response.
    pub fn category(&self) -> &'static str {
        match self {
            NegotiationError::Upstream { source, .. } if source.is_transient() => {
                "upstream_transient"
            }
            NegotiationError::Upstream { .. } => "upstream_permanent",
            NegotiationError::RoundBudgetExhausted { .. } => "no_consensus",
            NegotiationError::Cancelled => "cancelled",
        }
    }
}

fn upstream_reason(source: &UpstreamError, retries_exhausted: &bool) -> String {
    if *retries_exhausted {
        format!(
            "UpstreamError({}, retries_exhausted): {}",
            source.kind, source.message
        )
    } else {
        format!("UpstreamError({}): {}", source.kind, source.message)
    }
}
