use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use promptrace_types::{ModelSpec, ProviderKind};

mod catalog;
mod config;

pub use catalog::ModelCatalog;
pub use config::{
    BenchConfig, JudgeSettings, ProviderSettings, SinkSettings, DEFAULT_ANTHROPIC_BASE_URL,
    DEFAULT_FRIENDLI_BASE_URL, DEFAULT_JUDGE_MODEL, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Normalized output of one primary inference call. Character counts are
/// Unicode scalar counts; the caller owns timing and every derived metric.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub prompt_chars: usize,
    pub output_chars: usize,
}

impl Completion {
    fn new(prompt: &str, text: String) -> Self {
        Self {
            prompt_chars: prompt.chars().count(),
            output_chars: text.chars().count(),
            text,
        }
    }
}

/// One adapter per wire format. The adapter hides auth headers, base URL,
/// and request/response JSON behind this contract; callers never branch on
/// provider internals beyond picking the adapter for a `ProviderKind`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ProviderKind;
    async fn invoke(&self, model: &ModelSpec, prompt: &str) -> anyhow::Result<Completion>;
}

/// Static provider-to-adapter mapping, built once at startup. Each adapter
/// owns one reusable HTTP client with the configured request timeout,
/// shared read-only across concurrent calls.
pub struct AdapterSet {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl AdapterSet {
    pub fn new(config: &BenchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(OpenAiCompatibleAdapter {
                kind: ProviderKind::Friendli,
                base_url: config.friendli.base_url.clone(),
                api_key: config.friendli.api_key.clone(),
                client: client.clone(),
            }),
            Arc::new(OpenAiCompatibleAdapter {
                kind: ProviderKind::OpenAi,
                base_url: config.openai.base_url.clone(),
                api_key: config.openai.api_key.clone(),
                client: client.clone(),
            }),
            Arc::new(AnthropicAdapter {
                base_url: config.anthropic.base_url.clone(),
                api_key: config.anthropic.api_key.clone(),
                client,
            }),
        ];

        Ok(Self { adapters })
    }

    pub fn from_adapters(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn for_kind(&self, kind: ProviderKind) -> anyhow::Result<Arc<dyn ProviderAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.kind() == kind)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no adapter registered for provider `{kind}`"))
    }
}

/// Chat-completions adapter for OpenAI and every OpenAI-compatible backend
/// (FriendliAI serves the same wire shape behind a different base URL).
#[derive(Debug)]
pub struct OpenAiCompatibleAdapter {
    kind: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn invoke(&self, model: &ModelSpec, prompt: &str) -> anyhow::Result<Completion> {
        let Some(api_key) = &self.api_key else {
            anyhow::bail!("{} not set", api_key_env_hint(self.kind));
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&json!({
                "model": model.upstream_id,
                "messages": [{"role": "user", "content": prompt}],
                "stream": false,
            }))
            .send()
            .await
            .with_context(|| format!("{} request failed", self.kind))?;

        let status = response.status();
        let value: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("{} returned a malformed response body", self.kind))?;

        if !status.is_success() {
            let detail = extract_error_detail(&value)
                .unwrap_or_else(|| truncate_for_error(&value.to_string(), 300));
            anyhow::bail!("{} request failed with status {status}: {detail}", self.kind);
        }
        if let Some(detail) = extract_error_detail(&value) {
            anyhow::bail!("{} error: {detail}", self.kind);
        }

        let Some(text) = extract_chat_text(&value) else {
            anyhow::bail!(
                "{} returned no completion content for model `{}` (response: {})",
                self.kind,
                model.upstream_id,
                truncate_for_error(&value.to_string(), 300)
            );
        };
        Ok(Completion::new(prompt, text))
    }
}

/// Anthropic's messages API differs from the OpenAI shape in auth headers
/// and response layout, so it gets its own adapter.
#[derive(Debug)]
pub struct AnthropicAdapter {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn invoke(&self, model: &ModelSpec, prompt: &str) -> anyhow::Result<Completion> {
        let Some(api_key) = &self.api_key else {
            anyhow::bail!("{} not set", api_key_env_hint(ProviderKind::Anthropic));
        };

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&json!({
                "model": model.upstream_id,
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .context("anthropic request failed")?;

        let status = response.status();
        let value: serde_json::Value = response
            .json()
            .await
            .context("anthropic returned a malformed response body")?;

        if !status.is_success() {
            let detail = extract_error_detail(&value)
                .unwrap_or_else(|| truncate_for_error(&value.to_string(), 300));
            anyhow::bail!("anthropic request failed with status {status}: {detail}");
        }

        let Some(text) = value
            .get("content")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("text"))
            .and_then(|v| v.as_str())
            .filter(|t| !t.trim().is_empty())
        else {
            anyhow::bail!(
                "anthropic returned no completion content for model `{}` (response: {})",
                model.upstream_id,
                truncate_for_error(&value.to_string(), 300)
            );
        };
        Ok(Completion::new(prompt, text.to_string()))
    }
}

pub fn api_key_env_hint(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Friendli => "FRIENDLI_API_KEY or FRIENDLI_TOKEN",
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
    }
}

/// Providers that fail with a 2xx-shaped JSON envelope put the message at
/// `error.message` (OpenAI and compatibles) or top-level `message`.
fn extract_error_detail(value: &serde_json::Value) -> Option<String> {
    value
        .get("error")
        .and_then(|v| v.get("message"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        })
}

/// Pull the assistant text out of a chat-completions response. Reasoning
/// models may return their chain in `reasoning_content`; when present it is
/// appended after the answer so the comparison table shows it.
fn extract_chat_text(value: &serde_json::Value) -> Option<String> {
    let message = value
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))?;
    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let reasoning = message
        .get("reasoning_content")
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let text = if !content.is_empty() && !reasoning.is_empty() {
        format!("{content}\n\n[Reasoning: {reasoning}]")
    } else if !content.is_empty() {
        content.to_string()
    } else if !reasoning.is_empty() {
        reasoning.to_string()
    } else {
        message
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn truncate_for_error(input: &str, max_len: usize) -> String {
    if input.len() <= max_len {
        input.to_string()
    } else {
        let cut = input
            .char_indices()
            .take_while(|(i, _)| *i <= max_len)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        format!("{}...", &input[..cut])
    }
}
