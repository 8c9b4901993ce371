use std::sync::Arc;

use promptrace_bench::BenchmarkRunner;

mod http;

pub use http::{app_router, serve};

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<BenchmarkRunner>,
}

impl AppState {
    pub fn new(runner: Arc<BenchmarkRunner>) -> Self {
        Self { runner }
    }
}

pub fn build_id() -> String {
    if let Some(explicit) = option_env!("PROMPTRACE_BUILD_ID") {
        let trimmed = explicit.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    env!("CARGO_PKG_VERSION").to_string()
}
