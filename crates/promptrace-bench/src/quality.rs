//! Best-effort quality scoring through a judge model.
//!
//! The judge is its own collaborator with its own credential and endpoint;
//! when it is not configured no scoring is attempted at all. When it is,
//! any failure (transport, bad status, unparseable reply) degrades to "no
//! score" and never touches the rest of the result. Scoring runs after the
//! primary call's timer has stopped, so it never shows up in latency.

use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde_json::json;

use promptrace_providers::JudgeSettings;

pub struct QualityScorer {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl QualityScorer {
    pub fn new(settings: &JudgeSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build judge HTTP client")?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Rate `answer` against `prompt` on a 0-10 scale. `None` on any
    /// failure; the caller treats that as "unscored", not as an error.
    pub async fn score(&self, prompt: &str, answer: &str) -> Option<f64> {
        match self.try_score(prompt, answer).await {
            Ok(score) => Some(score),
            Err(err) => {
                tracing::debug!("quality scoring failed: {err}");
                None
            }
        }
    }

    async fn try_score(&self, prompt: &str, answer: &str) -> anyhow::Result<f64> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": rubric(prompt, answer)}],
                "temperature": 0.3,
                "max_tokens": 10,
            }))
            .send()
            .await
            .context("judge request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("judge request failed with status {status}");
        }

        let value: serde_json::Value = response
            .json()
            .await
            .context("judge returned a malformed response body")?;
        let raw = value
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .context("judge returned no content")?;

        parse_score(raw).with_context(|| format!("judge reply is not a score: `{raw}`"))
    }
}

fn rubric(prompt: &str, answer: &str) -> String {
    format!(
        "You are an expert evaluator of LLM responses. Evaluate the following \
         response for quality.\n\n\
         Original Prompt:\n{prompt}\n\n\
         Response to Evaluate:\n{answer}\n\n\
         Please evaluate this response on a scale of 0.0 to 10.0 based on:\n\
         1. Relevance: Does it directly address the prompt?\n\
         2. Completeness: Does it provide a thorough answer?\n\
         3. Accuracy: Is the information correct?\n\
         4. Clarity: Is it well-written and easy to understand?\n\n\
         Respond with ONLY a single number between 0.0 and 10.0 (e.g., \"7.5\"). \
         Do not include any explanation or other text."
    )
}

fn parse_score(raw: &str) -> Option<f64> {
    let score = raw.trim().parse::<f64>().ok()?;
    if !score.is_finite() {
        return None;
    }
    Some(score.clamp(0.0, 10.0))
}
