use serde::{Deserialize, Serialize};

use crate::error::NegotiationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Converged,
    Exhausted,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

/// Terminal result of one negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NegotiationOutcome {
    Converged { question: String },

    /// No marker within the round budget. Not an error, but never a success.
    Exhausted { rounds: u32 },

    Failed { reason: NegotiationError },

    Cancelled,
}

impl NegotiationOutcome {
    pub fn status(&self) -> SessionStatus {
        match self {
            NegotiationOutcome::Converged { .. } => SessionStatus::Converged,
            NegotiationOutcome::Exhausted { .. } => SessionStatus::Exhausted,
            NegotiationOutcome::Failed { .. } => SessionStatus::Failed,
            NegotiationOutcome::Cancelled => SessionStatus::Cancelled,
        }
    }

    pub fn question(&self) -> Option<&str> {
        match self {
            NegotiationOutcome::Converged { question } => Some(question),
            _ => None,
        }
    }

    /// Collapses the outcome for the outermost boundary.
    pub fn into_result(self) -> Result<String, NegotiationError> {
        match self {
            NegotiationOutcome::Converged { question } => Ok(question),
            NegotiationOutcome::Exhausted { rounds } => {
                Err(NegotiationError::RoundBudgetExhausted { max_rounds: rounds })
            }
            NegotiationOutcome::Failed { reason } => Err(reason),
            NegotiationOutcome::Cancelled => Err(NegotiationError::Cancelled),
        }
    }
}
