use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use promptrace_bench::{BenchmarkRunner, HttpSink, QualityScorer, RunSink, TracingSink};
use promptrace_observability::{
    default_logs_dir, emit_event, init_process_logging, BenchmarkEvent, ProcessKind,
};
use promptrace_providers::{AdapterSet, BenchConfig, ModelCatalog};
use promptrace_server::{serve, AppState};
use promptrace_types::BenchmarkRequest;

#[derive(Parser, Debug)]
#[command(name = "promptrace")]
#[command(about = "Concurrent LLM benchmark service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP API server.
    Serve {
        #[arg(long, alias = "host", default_value = "127.0.0.1")]
        hostname: String,
        #[arg(long, default_value_t = 8000, env = "PROMPTRACE_PORT")]
        port: u16,
    },
    /// Run one benchmark from the terminal and print the response JSON.
    Run {
        prompt: String,
        /// Comma-separated catalog model ids, e.g. `glm-4.6,gpt-4o-mini`.
        #[arg(long)]
        models: String,
    },
    /// Print the model catalog.
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { hostname, port } => {
            let logs_dir = default_logs_dir();
            let (_log_guard, log_info) =
                init_process_logging(ProcessKind::Server, &logs_dir, 14)?;
            emit_event(
                tracing::Level::INFO,
                BenchmarkEvent {
                    event: "logging.initialized",
                    component: "engine.main",
                    run_id: None,
                    model_id: None,
                    provider_id: None,
                    status: Some("ok"),
                    detail: Some("server jsonl logging initialized"),
                },
            );
            info!("server logging initialized: {:?}", log_info);

            let addr: SocketAddr = format!("{hostname}:{port}")
                .parse()
                .context("invalid hostname or port")?;
            let runner = build_runtime()?;
            info!(
                "catalog loaded with {} models",
                runner.catalog().models().len()
            );
            serve(addr, AppState::new(runner)).await?;
        }
        Command::Run { prompt, models } => {
            let model_ids = parse_model_ids(&models);
            let runner = build_runtime()?;
            let request = BenchmarkRequest { prompt, model_ids };
            let response = runner.run(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Models => {
            let runner = build_runtime()?;
            for model in runner.catalog().models() {
                println!("{}\t{}\t{}", model.id, model.provider, model.label);
            }
        }
    }

    Ok(())
}

fn build_runtime() -> anyhow::Result<Arc<BenchmarkRunner>> {
    let config = BenchConfig::from_env();
    let catalog = Arc::new(ModelCatalog::from_config(&config));
    let adapters = AdapterSet::new(&config)?;
    let scorer = match &config.judge {
        Some(judge) => Some(QualityScorer::new(judge)?),
        None => None,
    };
    let mut sinks: Vec<Arc<dyn RunSink>> = vec![Arc::new(TracingSink)];
    if let Some(settings) = &config.sink {
        sinks.push(Arc::new(HttpSink::from_settings(settings)?));
    }
    Ok(Arc::new(BenchmarkRunner::new(
        catalog, adapters, scorer, sinks,
    )))
}

fn parse_model_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
