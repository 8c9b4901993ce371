use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backends a catalog model can live on. The wire name is the lowercase
/// provider id the front end displays and filters by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Friendli,
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Friendli => "friendli",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static catalog entry. Loaded once at process start and read-only during
/// requests. `upstream_id` is the provider-side model name the adapter puts
/// on the wire; `id` is the stable key clients select by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub label: String,
    pub provider: ProviderKind,
    pub upstream_id: String,
    pub price_per_1k_tokens_usd: f64,
}

/// The projection of a `ModelSpec` exposed by `GET /api/models`. Prices and
/// upstream names stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub label: String,
    pub provider: ProviderKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRequest {
    pub prompt: String,
    pub model_ids: Vec<String>,
}

/// Per-model outcome. Exactly one branch exists; a failure never carries
/// partial metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelOutcome {
    Success {
        text: String,
        latency_ms: f64,
        tokens_estimate: u32,
        estimated_cost_usd: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        quality_score: Option<f64>,
    },
    Failure {
        error: String,
    },
}

impl ModelOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ModelOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ModelOutcome::Failure { error } => Some(error),
            ModelOutcome::Success { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    pub model_id: String,
    pub label: String,
    pub provider: ProviderKind,
    #[serde(flatten)]
    pub outcome: ModelOutcome,
}

/// Aggregate benchmark payload. `results` preserves the request's
/// `model_ids` order; `winner` is present iff at least one result succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResponse {
    pub prompt: String,
    pub results: Vec<ModelResult>,
    pub winner: Option<String>,
    pub winner_reason: Option<String>,
}

/// Compact per-run record handed to run sinks. Failed models keep zeroed
/// metrics plus the error message, so a sink sees one row per requested
/// model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub recorded_at: DateTime<Utc>,
    pub prompt: String,
    pub models: Vec<RunSummaryRow>,
    pub winner: Option<String>,
    pub succeeded: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummaryRow {
    pub model_id: String,
    pub latency_ms: f64,
    pub tokens_estimate: u32,
    pub estimated_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
