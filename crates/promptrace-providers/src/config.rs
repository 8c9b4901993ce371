//! Environment-driven configuration.
//!
//! Everything is read once at startup via `BenchConfig::from_env()`. API
//! keys and price overrides come from per-provider variables; the judge and
//! sink sections are independently optional and return `None` when their
//! key/url is unset, which disables that collaborator entirely.

use promptrace_types::ProviderKind;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FRIENDLI_BASE_URL: &str = "https://api.friendli.ai/serverless/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_FRIENDLI_PRICE_PER_1K: f64 = 0.0006;
pub const DEFAULT_OPENAI_PRICE_PER_1K: f64 = 0.0008;
pub const DEFAULT_ANTHROPIC_PRICE_PER_1K: f64 = 0.0030;

/// Bounded per-call timeout for primary inference requests, seconds.
/// Overridable with `PROMPTRACE_REQUEST_TIMEOUT_SECS`.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_JUDGE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub price_per_1k_tokens_usd: f64,
}

/// Judge endpoint for the quality scorer. Absent entirely when no judge
/// key is configured; the scorer is then skipped, not degraded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Optional HTTP run sink. Absence is a no-op, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSettings {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    pub friendli: ProviderSettings,
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub request_timeout_secs: u64,
    pub judge: Option<JudgeSettings>,
    pub sink: Option<SinkSettings>,
}

impl BenchConfig {
    pub fn from_env() -> Self {
        let friendli = ProviderSettings {
            // FRIENDLI_TOKEN is the legacy alias the hosted dashboard hands out.
            api_key: env_key("FRIENDLI_API_KEY").or_else(|| env_key("FRIENDLI_TOKEN")),
            base_url: env_base_url("FRIENDLI_BASE_URL", DEFAULT_FRIENDLI_BASE_URL),
            price_per_1k_tokens_usd: env_f64(
                "FRIENDLI_PRICE_PER_1K_TOKENS",
                DEFAULT_FRIENDLI_PRICE_PER_1K,
            ),
        };
        let openai = ProviderSettings {
            api_key: env_key("OPENAI_API_KEY"),
            base_url: env_base_url("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            price_per_1k_tokens_usd: env_f64(
                "OPENAI_PRICE_PER_1K_TOKENS",
                DEFAULT_OPENAI_PRICE_PER_1K,
            ),
        };
        let anthropic = ProviderSettings {
            api_key: env_key("ANTHROPIC_API_KEY"),
            base_url: env_base_url("ANTHROPIC_BASE_URL", DEFAULT_ANTHROPIC_BASE_URL),
            price_per_1k_tokens_usd: env_f64(
                "ANTHROPIC_PRICE_PER_1K_TOKENS",
                DEFAULT_ANTHROPIC_PRICE_PER_1K,
            ),
        };

        Self {
            friendli,
            openai,
            anthropic,
            request_timeout_secs: env_u64(
                "PROMPTRACE_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            judge: Self::judge_from_env(),
            sink: Self::sink_from_env(),
        }
    }

    fn judge_from_env() -> Option<JudgeSettings> {
        let api_key = env_key("PROMPTRACE_JUDGE_API_KEY")?;
        Some(JudgeSettings {
            api_key,
            base_url: env_base_url("PROMPTRACE_JUDGE_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            model: std::env::var("PROMPTRACE_JUDGE_MODEL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_JUDGE_MODEL.to_string()),
            timeout_secs: env_u64("PROMPTRACE_JUDGE_TIMEOUT_SECS", DEFAULT_JUDGE_TIMEOUT_SECS),
        })
    }

    fn sink_from_env() -> Option<SinkSettings> {
        let url = std::env::var("PROMPTRACE_SINK_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())?;
        Some(SinkSettings {
            url,
            token: env_key("PROMPTRACE_SINK_TOKEN"),
        })
    }

    pub fn settings_for(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Friendli => &self.friendli,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }
}

pub(crate) fn is_placeholder_api_key(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("x")
        || trimmed.eq_ignore_ascii_case("placeholder")
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !is_placeholder_api_key(v))
        .map(|v| v.trim().to_string())
}

fn env_base_url(name: &str, default: &str) -> String {
    let raw = std::env::var(name).unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.trim_end_matches('/').to_string()
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
