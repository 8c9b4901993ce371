use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use promptrace_bench::BenchmarkError;
use promptrace_types::{BenchmarkRequest, BenchmarkResponse, ModelsResponse};

use crate::{build_id, AppState};

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("promptrace API listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                futures::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/benchmark", post(run_benchmark))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": build_id() }))
}

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.runner.catalog().listings(),
    })
}

/// Well-formed requests always come back `200` with a fully itemized
/// per-model payload; only request-level validation failures surface as
/// HTTP errors.
async fn run_benchmark(
    State(state): State<AppState>,
    Json(request): Json<BenchmarkRequest>,
) -> Result<Json<BenchmarkResponse>, (StatusCode, Json<Value>)> {
    let response = state
        .runner
        .run(&request)
        .await
        .map_err(benchmark_error_response)?;
    Ok(Json(response))
}

fn benchmark_error_response(err: BenchmarkError) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "detail": err.to_string() })),
    )
}
