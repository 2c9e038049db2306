use serde::{Deserialize, Serialize};

use crate::model::interest::InterestProfile;

pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are two agents collaborating. \
Hold a short conversation and converge on ONE final question. \
When you agree, output exactly one line that starts with 'CONSENSUS:' followed by the question.";

pub const DEFAULT_SHARED_GOAL: &str = "Reach consensus on one question to ask both users \
based on their interests (fragments of their lives) to help them network with each other \
in real life. Make sure the question is normal and not too weirdly specific. \
Example: \"What is your favorite memory involving cats?\"";

/// Everything both agents see on every turn.
/// Seeded once when a session is created and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedContext {
    pub system_instructions: String,
    pub goal: String,
    pub profile_a: InterestProfile,
    pub profile_b: InterestProfile,
}

impl SharedContext {
    pub fn new(
        profile_a: InterestProfile,
        profile_b: InterestProfile,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
            goal: goal.into(),
            profile_a,
            profile_b,
        }
    }
}
