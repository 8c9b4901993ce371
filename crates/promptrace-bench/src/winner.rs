//! Winner selection.
//!
//! Pure and deterministic: only success-branch results are considered, each
//! gets a composite score in [0, 1]
//!
//! ```text
//! 0.35 * (1 - latency_norm) + 0.35 * (1 - cost_norm) + 0.30 * quality / 10
//! ```
//!
//! where `latency_norm` and `cost_norm` are min-max normalized within the
//! successful set (a zero range normalizes to 0) and an absent quality
//! score contributes the neutral midpoint 5.0. Ties break by lower
//! latency, then lexicographically smaller model id. Min-max normalization
//! is permutation-invariant, so the winner does not depend on request
//! order.

use serde::Serialize;

use promptrace_types::{ModelOutcome, ModelResult};

pub const LATENCY_WEIGHT: f64 = 0.35;
pub const COST_WEIGHT: f64 = 0.35;
pub const QUALITY_WEIGHT: f64 = 0.30;

const NEUTRAL_QUALITY: f64 = 5.0;

#[derive(Debug, Clone, Serialize)]
pub struct WinnerPick {
    pub model_id: String,
    pub reason: String,
}

struct Candidate<'a> {
    model_id: &'a str,
    latency_ms: f64,
    cost_usd: f64,
    quality: Option<f64>,
}

pub fn select(results: &[ModelResult]) -> Option<WinnerPick> {
    let candidates: Vec<Candidate<'_>> = results
        .iter()
        .filter_map(|r| match &r.outcome {
            ModelOutcome::Success {
                latency_ms,
                estimated_cost_usd,
                quality_score,
                ..
            } => Some(Candidate {
                model_id: &r.model_id,
                latency_ms: *latency_ms,
                cost_usd: *estimated_cost_usd,
                quality: *quality_score,
            }),
            ModelOutcome::Failure { .. } => None,
        })
        .collect();

    let first = candidates.first()?;
    if candidates.len() == 1 {
        return Some(WinnerPick {
            model_id: first.model_id.to_string(),
            reason: "only successful result".to_string(),
        });
    }

    let latency_lo = fold_min(candidates.iter().map(|c| c.latency_ms));
    let latency_hi = fold_max(candidates.iter().map(|c| c.latency_ms));
    let cost_lo = fold_min(candidates.iter().map(|c| c.cost_usd));
    let cost_hi = fold_max(candidates.iter().map(|c| c.cost_usd));

    let mut best: Option<(&Candidate<'_>, f64)> = None;
    for candidate in &candidates {
        let score = composite(candidate, latency_lo, latency_hi, cost_lo, cost_hi);
        let replace = match best {
            None => true,
            Some((incumbent, incumbent_score)) => {
                match score.total_cmp(&incumbent_score) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => {
                        match candidate.latency_ms.total_cmp(&incumbent.latency_ms) {
                            std::cmp::Ordering::Less => true,
                            std::cmp::Ordering::Greater => false,
                            std::cmp::Ordering::Equal => candidate.model_id < incumbent.model_id,
                        }
                    }
                }
            }
        };
        if replace {
            best = Some((candidate, score));
        }
    }

    let (winner, score) = best?;
    let quality_note = match winner.quality {
        Some(q) => format!("quality {q:.1}"),
        None => "unscored".to_string(),
    };
    Some(WinnerPick {
        model_id: winner.model_id.to_string(),
        reason: format!(
            "best weighted balance of latency, cost, and quality \
             (score {score:.3}; {latency:.0} ms, ${cost:.6}, {quality_note})",
            latency = winner.latency_ms,
            cost = winner.cost_usd,
        ),
    })
}

fn composite(
    candidate: &Candidate<'_>,
    latency_lo: f64,
    latency_hi: f64,
    cost_lo: f64,
    cost_hi: f64,
) -> f64 {
    let latency_norm = min_max_norm(candidate.latency_ms, latency_lo, latency_hi);
    let cost_norm = min_max_norm(candidate.cost_usd, cost_lo, cost_hi);
    let quality_unit = candidate.quality.unwrap_or(NEUTRAL_QUALITY) / 10.0;
    LATENCY_WEIGHT * (1.0 - latency_norm) + COST_WEIGHT * (1.0 - cost_norm)
        + QUALITY_WEIGHT * quality_unit
}

fn min_max_norm(value: f64, lo: f64, hi: f64) -> f64 {
    let range = hi - lo;
    if range <= 0.0 {
        0.0
    } else {
        (value - lo) / range
    }
}

fn fold_min(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

fn fold_max(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptrace_types::ProviderKind;

    fn success(id: &str, latency_ms: f64, cost: f64, quality: Option<f64>) -> ModelResult {
        ModelResult {
            model_id: id.to_string(),
            label: id.to_string(),
            provider: ProviderKind::OpenAi,
            outcome: ModelOutcome::Success {
                text: "out".to_string(),
                latency_ms,
                tokens_estimate: 10,
                estimated_cost_usd: cost,
                quality_score: quality,
            },
        }
    }

    fn failure(id: &str) -> ModelResult {
        ModelResult {
            model_id: id.to_string(),
            label: id.to_string(),
            provider: ProviderKind::Friendli,
            outcome: ModelOutcome::Failure {
                error: "timeout".to_string(),
            },
        }
    }

    #[test]
    fn no_successes_means_no_winner() {
        assert!(select(&[]).is_none());
        assert!(select(&[failure("m1"), failure("m2")]).is_none());
    }

    #[test]
    fn a_lone_success_always_wins() {
        let results = [
            failure("fast-but-broken"),
            success("m2", 99_999.0, 42.0, Some(0.0)),
        ];
        let pick = select(&results).expect("winner");
        assert_eq!(pick.model_id, "m2");
        assert_eq!(pick.reason, "only successful result");
    }

    #[test]
    fn failures_never_contribute_to_ranking() {
        let results = [
            failure("m0"),
            success("m1", 100.0, 0.001, Some(8.0)),
            success("m2", 900.0, 0.009, Some(2.0)),
        ];
        let pick = select(&results).expect("winner");
        assert_eq!(pick.model_id, "m1");
    }

    #[test]
    fn dominant_candidate_wins_on_composite() {
        // m1 is faster, cheaper, and better scored.
        let results = [
            success("m1", 100.0, 0.0001, Some(9.0)),
            success("m2", 500.0, 0.0009, Some(3.0)),
        ];
        let pick = select(&results).expect("winner");
        assert_eq!(pick.model_id, "m1");
        assert!(pick.reason.contains("latency, cost, and quality"));
    }

    #[test]
    fn quality_can_outweigh_a_small_latency_deficit() {
        // Identical cost. The latency range is 200 ms, so m2's 10 ms
        // deficit normalizes to 0.05 (a 0.0175 composite penalty), while
        // its quality lead over m1 is worth 0.24. m2 must win.
        let results = [
            success("m1", 100.0, 0.0005, Some(2.0)),
            success("m2", 110.0, 0.0005, Some(10.0)),
            success("m3", 300.0, 0.0005, Some(5.0)),
        ];
        let pick = select(&results).expect("winner");
        assert_eq!(pick.model_id, "m2");
    }

    #[test]
    fn with_two_candidates_the_slower_one_pays_the_full_latency_norm() {
        // Min-max over two values maps them to 0 and 1, so a tiny absolute
        // latency gap still costs the full latency weight; quality alone
        // (0.30) cannot overcome it.
        let results = [
            success("m1", 100.0, 0.0005, Some(2.0)),
            success("m2", 110.0, 0.0005, Some(10.0)),
        ];
        let pick = select(&results).expect("winner");
        assert_eq!(pick.model_id, "m1");
    }

    #[test]
    fn absent_quality_contributes_the_neutral_midpoint() {
        // Equal latency and cost: unscored (5.0) loses to 8.0, beats 2.0.
        let results = [
            success("scored-high", 100.0, 0.0005, Some(8.0)),
            success("unscored", 100.0, 0.0005, None),
        ];
        assert_eq!(select(&results).unwrap().model_id, "scored-high");

        let results = [
            success("scored-low", 100.0, 0.0005, Some(2.0)),
            success("unscored", 100.0, 0.0005, None),
        ];
        assert_eq!(select(&results).unwrap().model_id, "unscored");
    }

    #[test]
    fn ties_break_by_latency_then_model_id() {
        let results = [
            success("m-b", 100.0, 0.0005, Some(5.0)),
            success("m-a", 100.0, 0.0005, Some(5.0)),
        ];
        assert_eq!(select(&results).unwrap().model_id, "m-a");

        let results = [
            success("m-slow", 200.0, 0.0005, Some(5.0)),
            success("m-fast", 100.0, 0.0005, Some(5.0)),
        ];
        // Latency range makes the faster one win outright; the point is the
        // outcome stays fixed however the inputs are ordered.
        assert_eq!(select(&results).unwrap().model_id, "m-fast");
    }

    #[test]
    fn selection_is_permutation_invariant() {
        let a = success("m1", 120.0, 0.0004, Some(7.0));
        let b = success("m2", 80.0, 0.0009, Some(6.0));
        let c = success("m3", 300.0, 0.0001, None);
        let d = failure("m4");

        let forward = select(&[a.clone(), b.clone(), c.clone(), d.clone()]).unwrap();
        let reversed = select(&[d, c, b, a]).unwrap();
        assert_eq!(forward.model_id, reversed.model_id);
    }

    #[test]
    fn selection_is_deterministic_across_repeated_runs() {
        let results = [
            success("m1", 150.0, 0.0002, Some(6.5)),
            success("m2", 140.0, 0.0003, Some(6.5)),
        ];
        let first = select(&results).unwrap().model_id;
        for _ in 0..10 {
            assert_eq!(select(&results).unwrap().model_id, first);
        }
    }
}
