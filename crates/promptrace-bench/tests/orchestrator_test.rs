use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use promptrace_bench::{BenchmarkRunner, QualityScorer};
use promptrace_providers::{AdapterSet, Completion, JudgeSettings, ModelCatalog, ProviderAdapter};
use promptrace_types::{BenchmarkRequest, ModelOutcome, ModelSpec, ProviderKind};

#[derive(Clone, Debug)]
enum StubBehavior {
    Reply(&'static str),
    ReplyAfter(Duration, &'static str),
    Fail(&'static str),
    Panic,
}

#[derive(Debug)]
struct StubAdapter {
    kind: ProviderKind,
    calls: Arc<AtomicUsize>,
    behaviors: HashMap<String, StubBehavior>,
}

#[async_trait]
impl ProviderAdapter for StubAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn invoke(&self, model: &ModelSpec, prompt: &str) -> anyhow::Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .behaviors
            .get(&model.id)
            .cloned()
            .unwrap_or(StubBehavior::Fail("no stub behavior"));
        let text = match behavior {
            StubBehavior::Reply(text) => text.to_string(),
            StubBehavior::ReplyAfter(delay, text) => {
                tokio::time::sleep(delay).await;
                text.to_string()
            }
            StubBehavior::Fail(message) => anyhow::bail!("{message}"),
            StubBehavior::Panic => panic!("stub adapter exploded"),
        };
        Ok(Completion {
            prompt_chars: prompt.chars().count(),
            output_chars: text.chars().count(),
            text,
        })
    }
}

fn spec(id: &str, provider: ProviderKind, price: f64) -> ModelSpec {
    ModelSpec {
        id: id.to_string(),
        label: format!("Stub – {id}"),
        provider,
        upstream_id: format!("stub/{id}"),
        price_per_1k_tokens_usd: price,
    }
}

fn catalog() -> ModelCatalog {
    ModelCatalog::from_models(vec![
        spec("m1", ProviderKind::OpenAi, 0.0006),
        spec("m2", ProviderKind::Friendli, 0.0006),
        spec("m3", ProviderKind::OpenAi, 0.0008),
    ])
}

fn runner_with(
    behaviors: &[(&str, ProviderKind, StubBehavior)],
) -> (BenchmarkRunner, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut by_kind: HashMap<ProviderKind, HashMap<String, StubBehavior>> = HashMap::new();
    for (id, kind, behavior) in behaviors {
        by_kind
            .entry(*kind)
            .or_default()
            .insert((*id).to_string(), behavior.clone());
    }
    // Register a stub for every kind the catalog uses, even when a test
    // gives it no behaviors, so dispatch never fails for the wrong reason.
    for kind in [ProviderKind::OpenAi, ProviderKind::Friendli] {
        by_kind.entry(kind).or_default();
    }
    let adapters: Vec<Arc<dyn ProviderAdapter>> = by_kind
        .into_iter()
        .map(|(kind, behaviors)| {
            Arc::new(StubAdapter {
                kind,
                calls: calls.clone(),
                behaviors,
            }) as Arc<dyn ProviderAdapter>
        })
        .collect();
    let runner = BenchmarkRunner::new(
        Arc::new(catalog()),
        AdapterSet::from_adapters(adapters),
        None,
        Vec::new(),
    );
    (runner, calls)
}

fn request(prompt: &str, ids: &[&str]) -> BenchmarkRequest {
    BenchmarkRequest {
        prompt: prompt.to_string(),
        model_ids: ids.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn mixed_success_and_failure_yields_itemized_results_and_a_winner() {
    let (runner, _) = runner_with(&[
        ("m1", ProviderKind::OpenAi, StubBehavior::Reply("world")),
        ("m2", ProviderKind::Friendli, StubBehavior::Fail("timeout")),
    ]);
    let response = runner.run(&request("Hello", &["m1", "m2"])).await.unwrap();

    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].model_id, "m1");
    assert!(response.results[0].outcome.is_success());
    assert_eq!(response.results[1].model_id, "m2");
    assert_eq!(response.results[1].outcome.error(), Some("timeout"));
    assert_eq!(response.winner.as_deref(), Some("m1"));
    assert_eq!(
        response.winner_reason.as_deref(),
        Some("only successful result")
    );
    assert_eq!(response.prompt, "Hello");
}

#[tokio::test]
async fn results_preserve_input_order_independent_of_completion_order() {
    // m1 finishes last but is requested first.
    let (runner, calls) = runner_with(&[
        (
            "m1",
            ProviderKind::OpenAi,
            StubBehavior::ReplyAfter(Duration::from_millis(80), "slow"),
        ),
        ("m2", ProviderKind::Friendli, StubBehavior::Reply("quick")),
        ("m3", ProviderKind::OpenAi, StubBehavior::Reply("quick")),
    ]);
    let response = runner
        .run(&request("Hello", &["m1", "m2", "m3"]))
        .await
        .unwrap();

    let ids: Vec<&str> = response
        .results
        .iter()
        .map(|r| r.model_id.as_str())
        .collect();
    assert_eq!(ids, ["m1", "m2", "m3"]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn all_failures_mean_no_winner() {
    let (runner, _) = runner_with(&[
        ("m1", ProviderKind::OpenAi, StubBehavior::Fail("boom")),
        ("m2", ProviderKind::Friendli, StubBehavior::Fail("bust")),
    ]);
    let response = runner.run(&request("Hello", &["m1", "m2"])).await.unwrap();

    assert!(response.winner.is_none());
    assert_eq!(
        response.winner_reason.as_deref(),
        Some("no successful result")
    );
    assert!(response.results.iter().all(|r| !r.outcome.is_success()));
}

#[tokio::test]
async fn one_failing_model_never_aborts_its_siblings() {
    let (runner, _) = runner_with(&[
        ("m1", ProviderKind::OpenAi, StubBehavior::Fail("boom")),
        ("m2", ProviderKind::Friendli, StubBehavior::Reply("fine")),
        ("m3", ProviderKind::OpenAi, StubBehavior::Reply("fine")),
    ]);
    let response = runner
        .run(&request("Hello", &["m1", "m2", "m3"]))
        .await
        .unwrap();

    assert_eq!(response.results.len(), 3);
    assert!(!response.results[0].outcome.is_success());
    assert!(response.results[1].outcome.is_success());
    assert!(response.results[2].outcome.is_success());
}

#[tokio::test]
async fn a_panicking_unit_degrades_to_a_failure_result() {
    let (runner, _) = runner_with(&[
        ("m1", ProviderKind::OpenAi, StubBehavior::Panic),
        ("m2", ProviderKind::Friendli, StubBehavior::Reply("fine")),
    ]);
    let response = runner.run(&request("Hello", &["m1", "m2"])).await.unwrap();

    let error = response.results[0].outcome.error().unwrap();
    assert!(error.contains("benchmark task failed"));
    assert_eq!(response.winner.as_deref(), Some("m2"));
}

#[tokio::test]
async fn empty_prompt_is_rejected_before_any_dispatch() {
    let (runner, calls) = runner_with(&[("m1", ProviderKind::OpenAi, StubBehavior::Reply("x"))]);
    let err = runner.run(&request("   ", &["m1"])).await.unwrap_err();
    assert_eq!(err.to_string(), "Prompt cannot be empty");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_model_list_is_rejected_before_any_dispatch() {
    let (runner, calls) = runner_with(&[]);
    let err = runner.run(&request("Hello", &[])).await.unwrap_err();
    assert_eq!(err.to_string(), "At least one model must be selected");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_model_id_rejects_the_whole_request_before_any_dispatch() {
    let (runner, calls) = runner_with(&[("m1", ProviderKind::OpenAi, StubBehavior::Reply("x"))]);
    let err = runner
        .run(&request("Hello", &["m1", "m9"]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Model m9 not found");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn metrics_follow_the_documented_formulas_end_to_end() {
    // "Hello" is 5 chars, "world!!" is 7: ceil(12 / 4) = 3 tokens at
    // $0.0006 per 1k.
    let (runner, _) = runner_with(&[("m1", ProviderKind::OpenAi, StubBehavior::Reply("world!!"))]);
    let response = runner.run(&request("Hello", &["m1"])).await.unwrap();

    match &response.results[0].outcome {
        ModelOutcome::Success {
            latency_ms,
            tokens_estimate,
            estimated_cost_usd,
            quality_score,
            text,
        } => {
            assert_eq!(text, "world!!");
            assert_eq!(*tokens_estimate, 3);
            assert!((estimated_cost_usd - 3.0 / 1000.0 * 0.0006).abs() < 1e-12);
            assert!(*latency_ms >= 0.0);
            // No judge configured: scoring is skipped entirely.
            assert!(quality_score.is_none());
        }
        ModelOutcome::Failure { error } => panic!("unexpected failure: {error}"),
    }
}

#[tokio::test]
async fn a_failing_quality_scorer_leaves_the_success_branch_intact() {
    let calls = Arc::new(AtomicUsize::new(0));
    let adapter = Arc::new(StubAdapter {
        kind: ProviderKind::OpenAi,
        calls: calls.clone(),
        behaviors: HashMap::from([("m1".to_string(), StubBehavior::Reply("an answer"))]),
    });
    // Judge endpoint that refuses connections: scoring fails, the result
    // must not.
    let scorer = QualityScorer::new(&JudgeSettings {
        api_key: "test-key".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        model: "judge-model".to_string(),
        timeout_secs: 2,
    })
    .expect("scorer");
    let runner = BenchmarkRunner::new(
        Arc::new(catalog()),
        AdapterSet::from_adapters(vec![adapter]),
        Some(scorer),
        Vec::new(),
    );

    let response = runner.run(&request("Hello", &["m1"])).await.unwrap();
    match &response.results[0].outcome {
        ModelOutcome::Success { quality_score, .. } => assert!(quality_score.is_none()),
        ModelOutcome::Failure { error } => panic!("unexpected failure: {error}"),
    }
    assert_eq!(response.winner.as_deref(), Some("m1"));
}

#[tokio::test]
async fn duplicate_model_ids_produce_one_result_per_occurrence() {
    let (runner, calls) = runner_with(&[("m1", ProviderKind::OpenAi, StubBehavior::Reply("x"))]);
    let response = runner.run(&request("Hello", &["m1", "m1"])).await.unwrap();
    assert_eq!(response.results.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
