//! Completion Gateway — the single point of entry for all remote
//! text-completion calls in Folio.
//!
//! ARCHITECTURAL RULE: no other module may call the completion service
//! directly. All model interactions MUST go through [`CompletionBackend`].
//!
//! The gateway is stateless per call: it normalizes heterogeneous response
//! shapes into plain text (see [`extract`]), enforces a hard abort timeout
//! per request, and classifies failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

pub mod extract;

/// How much of a failed response body is preserved for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 600;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("gateway configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned status {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("completion response body could not be decoded: {0}")]
    Decode(String),

    #[error("completion response contained no extractable text")]
    EmptyContent,
}

/// One message in the conversation sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call options. Every call carries its own independent hard timeout.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// The completion backend seam. Production uses [`LlmClient`]; tests plug in
/// a scripted fake. Swapping the backend never touches callers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: &CallOptions,
    ) -> Result<String, LlmError>;
}

/// Bearer-authenticated client for an OpenAI-compatible completion endpoint.
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "completion API key is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: &CallOptions,
    ) -> Result<String, LlmError> {
        let body = json!({
            "model": opts.model,
            "temperature": opts.temperature,
            "max_tokens": opts.max_tokens,
            "messages": messages
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content}))
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(opts.timeout)
            .send()
            .await?;

        let status = response.status();
        // Read the raw body before structural decoding so a malformed or
        // failed response still yields diagnostics.
        let raw = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Transport {
                status: status.as_u16(),
                body: truncate_body(&raw),
            });
        }

        let payload: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| LlmError::Decode(e.to_string()))?;

        let text = extract::extract_text(&payload).ok_or(LlmError::EmptyContent)?;
        debug!(model = %opts.model, chars = text.len(), "completion call succeeded");
        Ok(text)
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_string()
    } else {
        body.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

/// Calls the backend, retrying once against the secondary model when the
/// failure is recoverable (anything but a configuration error or a clear
/// invalid-model-id rejection).
pub async fn call_with_fallback(
    backend: &dyn CompletionBackend,
    messages: &[ChatMessage],
    opts: &CallOptions,
    secondary_model: &str,
) -> Result<String, LlmError> {
    match backend.complete(messages, opts).await {
        Ok(text) => Ok(text),
        Err(primary_err) if should_fall_back(&primary_err) => {
            warn!(
                primary = %opts.model,
                secondary = %secondary_model,
                error = %primary_err,
                "primary model failed, retrying on secondary"
            );
            let fallback_opts = CallOptions {
                model: secondary_model.to_string(),
                ..opts.clone()
            };
            backend.complete(messages, &fallback_opts).await
        }
        Err(e) => Err(e),
    }
}

/// A transport failure that is clearly an invalid-model-id rejection will
/// fail on any model, so retrying is pointless. Everything else transient
/// gets one secondary-model attempt.
fn should_fall_back(err: &LlmError) -> bool {
    match err {
        LlmError::Configuration(_) => false,
        LlmError::Transport { status, body } => {
            let lower = body.to_lowercase();
            let invalid_model = (*status == 400 || *status == 404)
                && lower.contains("model")
                && (lower.contains("not found")
                    || lower.contains("does not exist")
                    || lower.contains("invalid"));
            !invalid_model
        }
        LlmError::Http(_) | LlmError::Decode(_) | LlmError::EmptyContent => true,
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted completion backend for state-machine and scenario tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{CallOptions, ChatMessage, CompletionBackend, LlmError};

    /// One scripted reply, popped per call in order.
    pub enum ScriptedReply {
        Text(String),
        Fail(LlmError),
    }

    /// Replays a fixed sequence of replies and records every call's model
    /// and rendered prompt for later assertions.
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<ScriptedReply>>,
        pub calls: Mutex<Vec<(String, String)>>, // (model, joined prompt)
    }

    impl ScriptedBackend {
        pub fn new(replies: Vec<ScriptedReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_texts(texts: Vec<&str>) -> Self {
            Self::new(
                texts
                    .into_iter()
                    .map(|t| ScriptedReply::Text(t.to_string()))
                    .collect(),
            )
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn models_called(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(m, _)| m.clone())
                .collect()
        }

        pub fn prompt_of_call(&self, index: usize) -> String {
            self.calls.lock().unwrap()[index].1.clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            opts: &CallOptions,
        ) -> Result<String, LlmError> {
            let prompt = messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n---\n");
            self.calls
                .lock()
                .unwrap()
                .push((opts.model.clone(), prompt));
            match self.replies.lock().unwrap().pop_front() {
                Some(ScriptedReply::Text(t)) => Ok(t),
                Some(ScriptedReply::Fail(e)) => Err(e),
                None => panic!("scripted backend exhausted: more calls than scripted replies"),
            }
        }
    }
}
