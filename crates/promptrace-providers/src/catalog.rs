//! Static model catalog.
//!
//! Built once at startup from `BenchConfig`; catalog order is the order the
//! models API reports. Prices are provider-level and come from the config,
//! so an env override moves every model of that provider at once.

use promptrace_types::{ModelInfo, ModelSpec, ProviderKind};

use crate::config::BenchConfig;

pub struct ModelCatalog {
    models: Vec<ModelSpec>,
}

impl ModelCatalog {
    pub fn from_models(models: Vec<ModelSpec>) -> Self {
        Self { models }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        let entries: &[(&str, &str, &str, ProviderKind)] = &[
            (
                "glm-4.6",
                "FriendliAI – GLM-4.6",
                "zai-org/GLM-4.6",
                ProviderKind::Friendli,
            ),
            (
                "llama-3.1-8b-instruct",
                "FriendliAI – Llama-3.1-8B-Instruct",
                "meta-llama/Llama-3.1-8B-Instruct",
                ProviderKind::Friendli,
            ),
            (
                "magistral-small-2506",
                "FriendliAI – Magistral-Small-2506",
                "mistralai/Magistral-Small-2506",
                ProviderKind::Friendli,
            ),
            (
                "a.x-3.1",
                "FriendliAI – A.X-3.1",
                "skt/A.X-3.1",
                ProviderKind::Friendli,
            ),
            (
                "qwen3-235b-thinking-2507",
                "FriendliAI – Qwen3-235B-Thinking-2507",
                "Qwen/Qwen3-235B-A22B-Thinking-2507",
                ProviderKind::Friendli,
            ),
            (
                "qwen3-235b-instruct-2507",
                "FriendliAI – Qwen3-235B-Instruct-2507",
                "Qwen/Qwen3-235B-A22B-Instruct-2507",
                ProviderKind::Friendli,
            ),
            (
                "llama-3.3-70b-instruct",
                "FriendliAI – Llama-3.3-70B-Instruct",
                "meta-llama/Llama-3.3-70B-Instruct",
                ProviderKind::Friendli,
            ),
            (
                "devstral-small-2505",
                "FriendliAI – Devstral-Small-2505",
                "mistralai/Devstral-Small-2505",
                ProviderKind::Friendli,
            ),
            (
                "gemma-3-27b-it",
                "FriendliAI – Gemma-3-27B-IT",
                "google/gemma-3-27b-it",
                ProviderKind::Friendli,
            ),
            (
                "qwen3-32b",
                "FriendliAI – Qwen3-32B",
                "Qwen/Qwen3-32B",
                ProviderKind::Friendli,
            ),
            (
                "gpt-4o-mini",
                "OpenAI – gpt-4o-mini",
                "gpt-4o-mini",
                ProviderKind::OpenAi,
            ),
            (
                "claude-3-5-haiku-latest",
                "Anthropic – Claude 3.5 Haiku",
                "claude-3-5-haiku-latest",
                ProviderKind::Anthropic,
            ),
        ];

        let models = entries
            .iter()
            .map(|(id, label, upstream_id, provider)| ModelSpec {
                id: (*id).to_string(),
                label: (*label).to_string(),
                provider: *provider,
                upstream_id: (*upstream_id).to_string(),
                price_per_1k_tokens_usd: config.settings_for(*provider).price_per_1k_tokens_usd,
            })
            .collect();

        Self { models }
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn listings(&self) -> Vec<ModelInfo> {
        self.models
            .iter()
            .map(|m| ModelInfo {
                id: m.id.clone(),
                label: m.label.clone(),
                provider: m.provider,
            })
            .collect()
    }
}
