use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    A,
    B,
}

impl Speaker {
    /// Speaker owning the given transcript index. A always opens.
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            Speaker::A
        } else {
            Speaker::B
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Speaker::A => Speaker::B,
            Speaker::B => Speaker::A,
        }
    }

    /// Label used inside prompts ("Agent 1" / "Agent 2").
    pub fn agent_label(self) -> &'static str {
        match self {
            Speaker::A => "Agent 1",
            Speaker::B => "Agent 2",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::A => f.write_str("A"),
            Speaker::B => f.write_str("B"),
        }
    }
}

/// One recorded model invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub index: usize,
    pub speaker: Speaker,
    pub prompt: String,
    pub response: String,
}
