//! Benchmark orchestration: validate, fan out, enrich, join, rank.
//!
//! One spawned task per requested model; units fail independently and the
//! batch always completes. Results are joined in input order, so output
//! order equals request order regardless of completion order, and no
//! locking is involved in collection.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use thiserror::Error;
use tracing::Level;
use uuid::Uuid;

use promptrace_observability::{emit_event, redact_text, BenchmarkEvent};
use promptrace_providers::{AdapterSet, ModelCatalog, ProviderAdapter};
use promptrace_types::{
    BenchmarkRequest, BenchmarkResponse, ModelOutcome, ModelResult, ModelSpec, RunSummary,
    RunSummaryRow,
};

use crate::quality::QualityScorer;
use crate::sink::{spawn_record, RunSink};
use crate::{metrics, winner};

/// Request-level failures. Rejected before any adapter dispatch; everything
/// past validation is captured inside the response payload instead.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,
    #[error("At least one model must be selected")]
    NoModels,
    #[error("Model {0} not found")]
    UnknownModel(String),
}

pub struct BenchmarkRunner {
    catalog: Arc<ModelCatalog>,
    adapters: Arc<AdapterSet>,
    scorer: Option<Arc<QualityScorer>>,
    sinks: Vec<Arc<dyn RunSink>>,
}

impl BenchmarkRunner {
    pub fn new(
        catalog: Arc<ModelCatalog>,
        adapters: AdapterSet,
        scorer: Option<QualityScorer>,
        sinks: Vec<Arc<dyn RunSink>>,
    ) -> Self {
        Self {
            catalog,
            adapters: Arc::new(adapters),
            scorer: scorer.map(Arc::new),
            sinks,
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub async fn run(
        &self,
        request: &BenchmarkRequest,
    ) -> Result<BenchmarkResponse, BenchmarkError> {
        if request.prompt.trim().is_empty() {
            return Err(BenchmarkError::EmptyPrompt);
        }
        if request.model_ids.is_empty() {
            return Err(BenchmarkError::NoModels);
        }
        let mut specs = Vec::with_capacity(request.model_ids.len());
        for id in &request.model_ids {
            let Some(spec) = self.catalog.get(id) else {
                return Err(BenchmarkError::UnknownModel(id.clone()));
            };
            specs.push(spec.clone());
        }

        let run_id = Uuid::new_v4().to_string();
        emit_event(
            Level::INFO,
            BenchmarkEvent {
                event: "benchmark.started",
                component: "bench.orchestrator",
                run_id: Some(&run_id),
                model_id: None,
                provider_id: None,
                status: Some("running"),
                detail: Some(&format!(
                    "models={} prompt={}",
                    specs.len(),
                    redact_text(&request.prompt)
                )),
            },
        );

        let mut handles = Vec::with_capacity(specs.len());
        for spec in &specs {
            let adapter = self.adapters.for_kind(spec.provider);
            let scorer = self.scorer.clone();
            let spec = spec.clone();
            let prompt = request.prompt.clone();
            handles.push(tokio::spawn(run_unit(adapter, scorer, spec, prompt)));
        }

        // Join preserves input order; a panicked unit degrades to a failure
        // result instead of taking its siblings down.
        let joined = join_all(handles).await;
        let mut results = Vec::with_capacity(specs.len());
        for (join_result, spec) in joined.into_iter().zip(specs.iter()) {
            match join_result {
                Ok(result) => results.push(result),
                Err(err) => results.push(failure_result(
                    spec,
                    format!("benchmark task failed: {err}"),
                )),
            }
        }

        let (winner_id, winner_reason) = match winner::select(&results) {
            Some(pick) => (Some(pick.model_id), Some(pick.reason)),
            None => (None, Some("no successful result".to_string())),
        };

        let summary = build_summary(&run_id, &request.prompt, &results, winner_id.as_deref());
        emit_event(
            Level::INFO,
            BenchmarkEvent {
                event: "benchmark.finished",
                component: "bench.orchestrator",
                run_id: Some(&run_id),
                model_id: None,
                provider_id: None,
                status: Some("ok"),
                detail: Some(&format!(
                    "succeeded={}/{} winner={}",
                    summary.succeeded,
                    summary.total,
                    winner_id.as_deref().unwrap_or("-")
                )),
            },
        );
        spawn_record(&self.sinks, &summary);

        Ok(BenchmarkResponse {
            prompt: request.prompt.clone(),
            results,
            winner: winner_id,
            winner_reason,
        })
    }
}

async fn run_unit(
    adapter: anyhow::Result<Arc<dyn ProviderAdapter>>,
    scorer: Option<Arc<QualityScorer>>,
    spec: ModelSpec,
    prompt: String,
) -> ModelResult {
    let adapter = match adapter {
        Ok(adapter) => adapter,
        Err(err) => return failure_result(&spec, err.to_string()),
    };

    // The timer wraps the primary call only; scoring happens after it
    // stops.
    let started = Instant::now();
    let invoked = adapter.invoke(&spec, &prompt).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    match invoked {
        Ok(completion) => {
            let tokens_estimate =
                metrics::estimate_tokens(completion.prompt_chars, completion.output_chars);
            let estimated_cost_usd =
                metrics::estimate_cost_usd(tokens_estimate, spec.price_per_1k_tokens_usd);
            let quality_score = match &scorer {
                Some(scorer) => scorer.score(&prompt, &completion.text).await,
                None => None,
            };
            emit_event(
                Level::INFO,
                BenchmarkEvent {
                    event: "benchmark.model.finished",
                    component: "bench.orchestrator",
                    run_id: None,
                    model_id: Some(&spec.id),
                    provider_id: Some(spec.provider.as_str()),
                    status: Some("ok"),
                    detail: Some(&format!(
                        "latency_ms={latency_ms:.0} tokens={tokens_estimate}"
                    )),
                },
            );
            ModelResult {
                model_id: spec.id,
                label: spec.label,
                provider: spec.provider,
                outcome: ModelOutcome::Success {
                    text: completion.text,
                    latency_ms,
                    tokens_estimate,
                    estimated_cost_usd,
                    quality_score,
                },
            }
        }
        Err(err) => {
            emit_event(
                Level::WARN,
                BenchmarkEvent {
                    event: "benchmark.model.finished",
                    component: "bench.orchestrator",
                    run_id: None,
                    model_id: Some(&spec.id),
                    provider_id: Some(spec.provider.as_str()),
                    status: Some("failed"),
                    detail: Some(&err.to_string()),
                },
            );
            failure_result(&spec, err.to_string())
        }
    }
}

fn failure_result(spec: &ModelSpec, error: String) -> ModelResult {
    ModelResult {
        model_id: spec.id.clone(),
        label: spec.label.clone(),
        provider: spec.provider,
        outcome: ModelOutcome::Failure { error },
    }
}

fn build_summary(
    run_id: &str,
    prompt: &str,
    results: &[ModelResult],
    winner: Option<&str>,
) -> RunSummary {
    let models = results
        .iter()
        .map(|r| match &r.outcome {
            ModelOutcome::Success {
                latency_ms,
                tokens_estimate,
                estimated_cost_usd,
                ..
            } => RunSummaryRow {
                model_id: r.model_id.clone(),
                latency_ms: *latency_ms,
                tokens_estimate: *tokens_estimate,
                estimated_cost_usd: *estimated_cost_usd,
                error: None,
            },
            ModelOutcome::Failure { error } => RunSummaryRow {
                model_id: r.model_id.clone(),
                latency_ms: 0.0,
                tokens_estimate: 0,
                estimated_cost_usd: 0.0,
                error: Some(error.clone()),
            },
        })
        .collect::<Vec<_>>();
    let succeeded = models.iter().filter(|m| m.error.is_none()).count();

    RunSummary {
        run_id: run_id.to_string(),
        recorded_at: chrono::Utc::now(),
        prompt: prompt.to_string(),
        models,
        winner: winner.map(|w| w.to_string()),
        succeeded,
        total: results.len(),
    }
}
