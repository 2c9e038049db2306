use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AgentSettings;
pub use crate::error::{UpstreamError, UpstreamErrorKind};

/// A model-backed conversational agent.
///
/// Implementations classify their failures as transient or permanent; the
/// scheduler decides what to retry. Dropping the returned future must abort
/// the call without side effects.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String, UpstreamError>;
}

#[derive(Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
}

#[derive(Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ChatMessageResponse,
}

#[derive(Deserialize)]
pub struct ChatMessageResponse {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// OpenAI-compatible chat-completions client.
pub struct HttpAgentClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
}

impl HttpAgentClient {
    pub fn new(settings: &AgentSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Number of models the upstream exposes. Used as a connection check.
    pub async fn list_models(&self) -> Result<usize, UpstreamError> {
        let request = self.authorized(self.http.get(format!("{}/models", self.base_url)));
        let resp = request.send().await.map_err(classify_transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status, resp.text().await.unwrap_or_default()));
        }

        let models: ModelList = resp.json().await.map_err(classify_transport)?;
        Ok(models.data.len())
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String, UpstreamError> {
        let req = ChatCompletionRequest {
            model: model_id,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&req);
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status, resp.text().await.unwrap_or_default()));
        }

        let body: ChatCompletionResponse = resp.json().await.map_err(classify_transport)?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| UpstreamError::permanent("completion contained no message content"))?;

        debug!(model = model_id, chars = content.len(), "completion received");
        Ok(content)
    }
}

pub fn classify_status(status: StatusCode) -> UpstreamErrorKind {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        UpstreamErrorKind::Transient
    } else {
        UpstreamErrorKind::Permanent
    }
}

fn status_error(status: StatusCode, body: String) -> UpstreamError {
    let body = body.trim();
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };
    UpstreamError {
        kind: classify_status(status),
        message,
    }
}

fn classify_transport(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        UpstreamError::transient(err.to_string())
    } else {
        UpstreamError::permanent(err.to_string())
    }
}
