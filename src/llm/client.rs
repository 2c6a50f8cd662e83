use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::LlmConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const BACKOFF_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Model API disabled due to recent errors (backoff active)")]
    BackoffActive,
    #[error("Empty response from model")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// A generative model that answers the last user turn of a conversation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn send(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LlmProvider {
    Gemini,
    OpenAI,
    Anthropic,
}

#[derive(Debug, Clone, Copy)]
struct Sampling {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

pub struct LlmClient {
    provider: LlmProvider,
    api_key: String,
    base_url: Option<String>,
    model: String,
    sampling: Sampling,
    client: Client,
    /// Minimum interval between calls.
    rate_limiter: Mutex<Instant>,
    rate_limit_duration: Duration,
    /// Set on API errors, cleared after 5 minutes.
    backoff_active: AtomicBool,
    backoff_until: Mutex<Option<Instant>>,
}

impl LlmClient {
    /// Construct an LlmClient from config. Returns `None` if disabled, the
    /// provider is unknown, or the API key is unset.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let provider = match config.provider.as_str() {
            "gemini" => LlmProvider::Gemini,
            "openai" => LlmProvider::OpenAI,
            "anthropic" => LlmProvider::Anthropic,
            other => {
                tracing::warn!("Unknown model provider '{other}', disabling model calls");
                return None;
            }
        };

        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .map(|v| v.trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        let api_key = match std::env::var(&config.api_key_env) {
            Ok(v) if !v.is_empty() => v,
            _ => {
                // Local OpenAI-compatible servers (LM Studio, etc.) accept any key.
                if provider == LlmProvider::OpenAI
                    && base_url.as_deref().is_some_and(is_local_base_url)
                {
                    "lm-studio".to_string()
                } else {
                    tracing::debug!("Model disabled: env var {} is empty", config.api_key_env);
                    return None;
                }
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .ok()?;

        Some(Self {
            provider,
            api_key,
            base_url,
            model: config.model.clone(),
            sampling: Sampling {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
            },
            client,
            rate_limit_duration: Duration::from_millis(crate::config::RATE_LIMIT_MS),
            rate_limiter: Mutex::new(Instant::now() - Duration::from_secs(1)),
            backoff_active: AtomicBool::new(false),
            backoff_until: Mutex::new(None),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn should_activate_backoff(error: &LlmError) -> bool {
        matches!(error, LlmError::Api { status, .. } if *status == 429 || *status >= 500 || *status == 401 || *status == 403)
    }

    async fn rate_limit(&self) {
        let mut last_call = self.rate_limiter.lock().await;
        let elapsed = last_call.elapsed();
        if elapsed < self.rate_limit_duration {
            tokio::time::sleep(self.rate_limit_duration - elapsed).await;
        }
        *last_call = Instant::now();
    }

    async fn check_backoff(&self) -> Result<(), LlmError> {
        if !self.backoff_active.load(Ordering::Relaxed) {
            return Ok(());
        }
        let guard = self.backoff_until.lock().await;
        if let Some(until) = *guard {
            if Instant::now() >= until {
                drop(guard);
                self.backoff_active.store(false, Ordering::Relaxed);
                return Ok(());
            }
        }
        Err(LlmError::BackoffActive)
    }

    async fn activate_backoff(&self) {
        tracing::warn!("Model API error, activating 5-minute backoff");
        *self.backoff_until.lock().await =
            Some(Instant::now() + Duration::from_secs(BACKOFF_SECS));
        self.backoff_active.store(true, Ordering::Relaxed);
    }

    async fn parse_api_response<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, LlmError> {
        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }
        Ok(resp.json().await?)
    }

    async fn call_gemini(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let body = GeminiRequest::new(messages, self.sampling);
        let base = self.base_url.as_deref().unwrap_or(GEMINI_BASE_URL);
        let url = format!("{base}/v1beta/models/{}:generateContent", self.model);

        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let parsed: GeminiResponse = Self::parse_api_response(resp).await?;
        Ok(parsed.text())
    }

    async fn call_openai(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let body = OpenAIRequest {
            model: self.model.clone(),
            messages: messages.iter().map(TextMessage::from).collect(),
            max_tokens: self.sampling.max_output_tokens,
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
        };

        let url = match self.base_url.as_deref() {
            Some(base) => url_with_v1_path(base, "chat/completions"),
            None => "https://api.openai.com/v1/chat/completions".to_string(),
        };

        let resp = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let parsed: OpenAIResponse = Self::parse_api_response(resp).await?;
        Ok(parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default())
    }

    async fn call_anthropic(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.sampling.max_output_tokens,
            // Anthropic caps temperature at 1.0.
            temperature: self.sampling.temperature.min(1.0),
            messages: messages.iter().map(TextMessage::from).collect(),
        };

        let url = match self.base_url.as_deref() {
            Some(base) => url_with_v1_path(base, "messages"),
            None => ANTHROPIC_MESSAGES_URL.to_string(),
        };

        let resp = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let parsed: AnthropicResponse = Self::parse_api_response(resp).await?;
        Ok(parsed
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect())
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn send(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.check_backoff().await?;
        self.rate_limit().await;

        tracing::debug!(
            provider = ?self.provider,
            model = %self.model,
            turns = messages.len(),
            "Sending model request"
        );

        let result = match self.provider {
            LlmProvider::Gemini => self.call_gemini(messages).await,
            LlmProvider::OpenAI => self.call_openai(messages).await,
            LlmProvider::Anthropic => self.call_anthropic(messages).await,
        };

        match result {
            Ok(text) if text.trim().is_empty() => Err(LlmError::EmptyResponse),
            Ok(text) => Ok(text),
            Err(e) => {
                if Self::should_activate_backoff(&e) {
                    self.activate_backoff().await;
                }
                Err(e)
            }
        }
    }
}

// --- Gemini API types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

impl GeminiRequest {
    fn new(messages: &[ChatMessage], sampling: Sampling) -> Self {
        Self {
            contents: messages
                .iter()
                .map(|m| GeminiContent {
                    role: match m.role {
                        ChatRole::User => "user".to_string(),
                        ChatRole::Model => "model".to_string(),
                    },
                    parts: vec![GeminiPart {
                        text: Some(m.content.clone()),
                    }],
                })
                .collect(),
            generation_config: GeminiGenerationConfig {
                temperature: sampling.temperature,
                top_p: sampling.top_p,
                top_k: sampling.top_k,
                max_output_tokens: sampling.max_output_tokens,
                response_mime_type: "text/plain".to_string(),
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

// --- OpenAI API types ---

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<TextMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct TextMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for TextMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: match message.role {
                ChatRole::User => "user".to_string(),
                ChatRole::Model => "assistant".to_string(),
            },
            content: message.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: String,
}

// --- Anthropic API types ---

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<TextMessage>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

// --- Helpers ---

fn url_with_v1_path(base_url: &str, suffix: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let suffix = suffix.trim_start_matches('/');
    if base.ends_with("/v1") {
        format!("{base}/{suffix}")
    } else {
        format!("{base}/v1/{suffix}")
    }
}

fn is_local_base_url(base_url: &str) -> bool {
    let lower = base_url.to_ascii_lowercase();
    let host_part = lower
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&lower);
    host_part.starts_with("127.0.0.1")
        || host_part.starts_with("localhost")
        || host_part.starts_with("[::1]")
}
