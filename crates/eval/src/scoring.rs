//! Scoring strategies: pure, deterministic folds from a set of
//! evaluations to a single decision and confidence.

use std::collections::BTreeMap;

use crate::types::{EngineError, Evaluation};

/// The outcome of scoring: a decision and a confidence in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub decision: String,
    pub confidence: f64,
}

/// A pure scoring function over a non-empty evaluation set.
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, evaluations: &[Evaluation]) -> Result<Score, EngineError>;
}

fn require_non_empty(evaluations: &[Evaluation]) -> Result<(), EngineError> {
    if evaluations.is_empty() {
        return Err(EngineError::Validation(
            "scoring requires at least one evaluation".into(),
        ));
    }
    Ok(())
}

// ──────────────────────────────────────────────
// Weighted average (default)
// ──────────────────────────────────────────────

/// Groups evaluations by decision and picks the group with the
/// largest weight sum; confidence is that group's share of the total
/// weight. Ties break to the lexicographically smallest decision.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedAverage;

impl ScoringStrategy for WeightedAverage {
    fn name(&self) -> &str {
        "weighted_average"
    }

    fn score(&self, evaluations: &[Evaluation]) -> Result<Score, EngineError> {
        require_non_empty(evaluations)?;

        let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
        let mut total = 0.0;
        for evaluation in evaluations {
            *groups.entry(evaluation.decision()).or_insert(0.0) += evaluation.weight();
            total += evaluation.weight();
        }

        if total == 0.0 {
            // All-zero weights: keep the first evaluation's decision,
            // with no confidence behind it.
            return Ok(Score {
                decision: evaluations[0].decision().to_string(),
                confidence: 0.0,
            });
        }

        // BTreeMap iterates keys ascending, so a strict comparison
        // keeps the lexicographically smallest decision on ties.
        let mut best = ("", f64::MIN);
        for (decision, sum) in &groups {
            if *sum > best.1 {
                best = (decision, *sum);
            }
        }

        Ok(Score {
            decision: best.0.to_string(),
            confidence: best.1 / total,
        })
    }
}

// ──────────────────────────────────────────────
// Majority vote
// ──────────────────────────────────────────────

/// Picks the decision suggested by the most evaluations, ignoring
/// weights; confidence is the winning group's share of the count.
#[derive(Debug, Default, Clone, Copy)]
pub struct MajorityVote;

impl ScoringStrategy for MajorityVote {
    fn name(&self) -> &str {
        "majority_vote"
    }

    fn score(&self, evaluations: &[Evaluation]) -> Result<Score, EngineError> {
        require_non_empty(evaluations)?;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for evaluation in evaluations {
            *counts.entry(evaluation.decision()).or_insert(0) += 1;
        }
        let mut best = ("", 0usize);
        for (decision, count) in &counts {
            if *count > best.1 {
                best = (decision, *count);
            }
        }

        Ok(Score {
            decision: best.0.to_string(),
            confidence: best.1 as f64 / evaluations.len() as f64,
        })
    }
}

// ──────────────────────────────────────────────
// Highest single weight
// ──────────────────────────────────────────────

/// Follows the single most confident evaluator; confidence is its
/// weight.
#[derive(Debug, Default, Clone, Copy)]
pub struct HighestWeight;

impl ScoringStrategy for HighestWeight {
    fn name(&self) -> &str {
        "highest_weight"
    }

    fn score(&self, evaluations: &[Evaluation]) -> Result<Score, EngineError> {
        require_non_empty(evaluations)?;

        let mut best: Option<&Evaluation> = None;
        for evaluation in evaluations {
            let better = match best {
                None => true,
                Some(current) => {
                    evaluation.weight() > current.weight()
                        || (evaluation.weight() == current.weight()
                            && evaluation.decision() < current.decision())
                }
            };
            if better {
                best = Some(evaluation);
            }
        }
        let best = best.expect("non-empty checked above");

        Ok(Score {
            decision: best.decision().to_string(),
            confidence: best.weight(),
        })
    }
}
