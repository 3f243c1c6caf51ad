use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::prompt::Prompt;

/// Outcome classes of a single generation call. Rotation and retry decisions match on these
/// variants rather than inspecting error text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The backend is throttling us; worth retrying after a pause.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// The model was put on cooldown before this attempt could start.
    #[error("model is cooling down")]
    CoolingDown,
    #[error("generation failed: {0}")]
    Failed(String),
}

impl GenerationError {
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }
}

/// Narrow contract for anything that turns a prompt into prose.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError>;
}

/// Chat-completions backend for OpenAI and OpenAI-compatible endpoints (e.g. Gemini).
///
/// Requests are built with async-openai's types but sent directly, so the HTTP status of a
/// rejected call is kept for classification whatever shape the error body has.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, api_base: &str, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.to_owned(),
            model: model.into(),
            temperature,
        }
    }
}

/// Builds a client whose built-in 429 backoff is disabled, so retry policy stays with the
/// caller.
pub fn openai_client(api_key: &str, api_base: &str) -> Client<OpenAIConfig> {
    let backoff = backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Client::with_config(
        OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base),
    )
    .with_backoff(backoff)
}

#[async_trait]
impl GenerationBackend for OpenAiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages([
                ChatCompletionRequestSystemMessage::from(prompt.system.clone()).into(),
                ChatCompletionRequestUserMessage::from(prompt.user.clone()).into(),
            ])
            .build()
            .map_err(|err| GenerationError::Failed(err.to_string()))?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| classify_transport_error(&err))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| classify_transport_error(&err))?;

        if !status.is_success() {
            return Err(classify_error_response(status, &body));
        }

        let completion: CreateChatCompletionResponse = serde_json::from_slice(&body)
            .map_err(|err| GenerationError::Failed(format!("unreadable completion: {err}")))?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// Error `type`/`code`/`status` values providers use for throttling and exhausted quotas.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate_limit_exceeded",
    "insufficient_quota",
    "requests",
    "tokens",
    "resource_exhausted",
    "429",
];

const MAX_ERROR_BODY_CHARS: usize = 200;

fn is_rate_limit_marker(value: &Value) -> bool {
    let marker = match value {
        Value::String(text) => text.trim().to_ascii_lowercase(),
        Value::Number(number) => number.to_string(),
        _ => return false,
    };
    RATE_LIMIT_MARKERS.contains(&marker.as_str())
}

/// The `error` objects of a response body; OpenAI sends one object, Gemini sometimes wraps
/// it in an array.
fn error_objects(body: &Value) -> Vec<&Value> {
    let entries: Vec<&Value> = match body {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    entries
        .into_iter()
        .filter_map(|entry| entry.get("error"))
        .collect()
}

/// Maps a non-success response onto the generation outcome classes. A 429 is always a rate
/// limit; other statuses are one only when the error body carries a throttling marker.
pub fn classify_error_response(status: StatusCode, body: &[u8]) -> GenerationError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let errors = parsed.as_ref().map(error_objects).unwrap_or_default();

    let message = errors
        .iter()
        .find_map(|error| error.get("message").and_then(Value::as_str))
        .map_or_else(
            || {
                String::from_utf8_lossy(body)
                    .chars()
                    .take(MAX_ERROR_BODY_CHARS)
                    .collect::<String>()
            },
            str::to_owned,
        );
    let message = format!("{status}: {}", message.trim());

    let marked = errors.iter().any(|error| {
        ["type", "code", "status"]
            .iter()
            .filter_map(|field| error.get(*field))
            .any(is_rate_limit_marker)
    });

    if status == StatusCode::TOO_MANY_REQUESTS || marked {
        GenerationError::RateLimited(message)
    } else {
        GenerationError::Failed(message)
    }
}

fn classify_transport_error(err: &reqwest::Error) -> GenerationError {
    if err.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
        GenerationError::RateLimited(err.to_string())
    } else {
        GenerationError::Failed(err.to_string())
    }
}
