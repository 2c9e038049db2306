use std::fmt;

use serde::{Deserialize, Serialize};

/// Free-text summary of one party's interests.
/// Content is never validated: empty or odd profiles pass through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterestProfile(String);

impl InterestProfile {
    pub fn new(summary: impl Into<String>) -> Self {
        Self(summary.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for InterestProfile {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for InterestProfile {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for InterestProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
