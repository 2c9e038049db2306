use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::context::DEFAULT_SHARED_GOAL;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub agent: AgentSettings,
    pub negotiation: NegotiationSettings,
    pub retry: RetrySettings,

    /// Cap on model calls in flight across every session.
    pub max_concurrent_calls: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            agent: AgentSettings::default(),
            negotiation: NegotiationSettings::default(),
            retry: RetrySettings::default(),
            max_concurrent_calls: 8,
        }
    }
}

/// Upstream chat-completions endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AgentSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model_id: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".into(),
            api_key: None,
            model_id: "local-model".into(),
            temperature: 0.7,
            request_timeout_secs: 60,
        }
    }
}

impl AgentSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NegotiationSettings {
    pub max_rounds: u32,
    pub goal: String,

    /// Similar fragment pairs used to build each profile.
    pub top_k: usize,

    /// Upper bound on a single model call, retries excluded.
    pub call_timeout_secs: u64,
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            max_rounds: 4,
            goal: DEFAULT_SHARED_GOAL.into(),
            top_k: 5,
            call_timeout_secs: 60,
        }
    }
}

impl NegotiationSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}
