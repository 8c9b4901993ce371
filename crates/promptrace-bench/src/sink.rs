//! Run sinks: fire-and-forget receivers of benchmark summaries.
//!
//! Sinks are spawned onto the runtime and never awaited on the request
//! path; a sink failure is logged and dropped. Absence of sink
//! configuration is a no-op, not an error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::Level;

use promptrace_observability::{emit_event, redact_text, BenchmarkEvent};
use promptrace_providers::SinkSettings;
use promptrace_types::RunSummary;

#[async_trait]
pub trait RunSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn record(&self, summary: &RunSummary) -> anyhow::Result<()>;
}

/// Writes the summary into the structured log stream, one row per model.
/// The prompt is redacted; raw user text does not belong in logs.
pub struct TracingSink;

#[async_trait]
impl RunSink for TracingSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn record(&self, summary: &RunSummary) -> anyhow::Result<()> {
        for row in &summary.models {
            match &row.error {
                None => tracing::info!(
                    target: "promptrace.sink",
                    run_id = %summary.run_id,
                    model_id = %row.model_id,
                    latency_ms = row.latency_ms,
                    tokens_estimate = row.tokens_estimate,
                    estimated_cost_usd = row.estimated_cost_usd,
                    "benchmark_model_metrics"
                ),
                Some(error) => tracing::info!(
                    target: "promptrace.sink",
                    run_id = %summary.run_id,
                    model_id = %row.model_id,
                    error = %error,
                    "benchmark_model_metrics"
                ),
            }
        }
        emit_event(
            Level::INFO,
            BenchmarkEvent {
                event: "benchmark.summary",
                component: "bench.sink",
                run_id: Some(&summary.run_id),
                model_id: None,
                provider_id: None,
                status: Some("ok"),
                detail: Some(&format!(
                    "succeeded={}/{} winner={} prompt={}",
                    summary.succeeded,
                    summary.total,
                    summary.winner.as_deref().unwrap_or("-"),
                    redact_text(&summary.prompt)
                )),
            },
        );
        Ok(())
    }
}

/// POSTs the summary JSON to an external collector.
pub struct HttpSink {
    url: String,
    token: Option<String>,
    client: Client,
}

impl HttpSink {
    pub fn from_settings(settings: &SinkSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build sink HTTP client")?;
        Ok(Self {
            url: settings.url.clone(),
            token: settings.token.clone(),
            client,
        })
    }
}

#[async_trait]
impl RunSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn record(&self, summary: &RunSummary) -> anyhow::Result<()> {
        let mut request = self.client.post(&self.url).json(summary);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.context("sink request failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("sink rejected summary with status {status}");
        }
        Ok(())
    }
}

/// Hand the summary to every sink without blocking the caller. Each sink
/// runs on its own task; errors end here.
pub fn spawn_record(sinks: &[Arc<dyn RunSink>], summary: &RunSummary) {
    for sink in sinks {
        let sink = sink.clone();
        let summary = summary.clone();
        tokio::spawn(async move {
            if let Err(err) = sink.record(&summary).await {
                tracing::warn!(
                    sink = sink.name(),
                    run_id = %summary.run_id,
                    "run sink failed: {err}"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use promptrace_types::RunSummaryRow;

    fn summary() -> RunSummary {
        RunSummary {
            run_id: "run-1".to_string(),
            recorded_at: Utc::now(),
            prompt: "Hello".to_string(),
            models: vec![RunSummaryRow {
                model_id: "m1".to_string(),
                latency_ms: 100.0,
                tokens_estimate: 5,
                estimated_cost_usd: 0.00003,
                error: None,
            }],
            winner: Some("m1".to_string()),
            succeeded: 1,
            total: 1,
        }
    }

    #[tokio::test]
    async fn tracing_sink_always_accepts_a_summary() {
        assert!(TracingSink.record(&summary()).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_http_sink_reports_an_error_without_panicking() {
        let sink = HttpSink::from_settings(&SinkSettings {
            url: "http://127.0.0.1:9/runs".to_string(),
            token: None,
        })
        .expect("sink");
        assert!(sink.record(&summary()).await.is_err());
    }

    #[tokio::test]
    async fn spawn_record_returns_without_awaiting_sinks() {
        let sinks: Vec<Arc<dyn RunSink>> = vec![Arc::new(TracingSink)];
        // Must not block; the spawned task owns its own copy of the summary.
        spawn_record(&sinks, &summary());
    }
}
