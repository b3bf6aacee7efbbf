//! The decision pipeline: run evaluators, score, explain, audit.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::audit::{build_audit_payload, AuditSink, HashCache, NoopAuditSink};
use crate::context::Context;
use crate::evaluator::Evaluator;
use crate::scoring::{ScoringStrategy, WeightedAverage};
use crate::types::{Decision, EngineError, Evaluation};

/// Environment variable that disables evaluation validation when set
/// to `"production"`.
pub const ENV_FLAG: &str = "ARBITER_ENV";

pub struct Agent {
    evaluators: Vec<Arc<dyn Evaluator>>,
    scoring: Arc<dyn ScoringStrategy>,
    audit: Arc<dyn AuditSink>,
    validate: bool,
    cache: Option<Arc<HashCache>>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    /// Run the full pipeline over a context.
    ///
    /// Evaluator faults are isolated: a failing evaluator is logged on
    /// the warning channel and contributes nothing. Scoring and audit
    /// faults abort the call.
    pub fn decide(
        &self,
        context: impl Into<Context>,
        feedback: &Map<String, Value>,
    ) -> Result<Decision, EngineError> {
        let context = context.into();

        let mut evaluations: Vec<Evaluation> = Vec::new();
        for evaluator in &self.evaluators {
            match evaluator.evaluate(&context, feedback) {
                Ok(Some(evaluation)) => evaluations.push(evaluation),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        evaluator = evaluator.name(),
                        error = %error,
                        "evaluator failed; dropping its judgment"
                    );
                }
            }
        }
        if evaluations.is_empty() {
            return Err(EngineError::NoEvaluations);
        }

        if self.validate {
            validate_evaluations(&evaluations)?;
        }

        let score = self.scoring.score(&evaluations)?;
        let explanations = build_explanations(&score.decision, score.confidence, &evaluations);

        let cache = self.cache.as_deref().unwrap_or_else(|| HashCache::global());
        let audit_payload = build_audit_payload(
            &context,
            &evaluations,
            &score.decision,
            score.confidence,
            self.scoring.name(),
            cache,
        )?;

        let decision = Decision::new(
            score.decision,
            score.confidence,
            explanations,
            evaluations,
            audit_payload,
        )?;
        self.audit.record(&decision, &context)?;
        Ok(decision)
    }
}

fn validate_evaluations(evaluations: &[Evaluation]) -> Result<(), EngineError> {
    for evaluation in evaluations {
        if !(0.0..=1.0).contains(&evaluation.weight()) {
            return Err(EngineError::Validation(format!(
                "evaluator '{}' produced weight {} outside [0, 1]",
                evaluation.evaluator_name(),
                evaluation.weight()
            )));
        }
        if evaluation.decision().is_empty() {
            return Err(EngineError::Validation(format!(
                "evaluator '{}' produced an empty decision",
                evaluation.evaluator_name()
            )));
        }
    }
    Ok(())
}

/// Numbers in explanations round to two decimals and always carry a
/// fraction, so a full-confidence decision prints as `1.0`.
fn fmt_num(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let mut text = format!("{}", rounded);
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

fn build_explanations(
    decision: &str,
    confidence: f64,
    evaluations: &[Evaluation],
) -> Vec<String> {
    let mut lines = vec![format!(
        "Decision: {} (confidence: {})",
        decision,
        fmt_num(confidence)
    )];

    for evaluation in evaluations.iter().filter(|e| e.decision() == decision) {
        let line = match evaluation.metadata().get("rule_id").and_then(Value::as_str) {
            Some(rule_id) => format!(
                "{}: rule '{}' matched - {} (weight: {})",
                evaluation.evaluator_name(),
                rule_id,
                evaluation.reason(),
                fmt_num(evaluation.weight())
            ),
            None => format!(
                "{}: {} (weight: {})",
                evaluation.evaluator_name(),
                evaluation.reason(),
                fmt_num(evaluation.weight())
            ),
        };
        lines.push(line);
    }

    let dissenting: Vec<&Evaluation> = evaluations
        .iter()
        .filter(|e| e.decision() != decision)
        .collect();
    if !dissenting.is_empty() {
        lines.push("Conflicting evaluations considered:".to_string());
        for evaluation in dissenting {
            lines.push(format!(
                "{} suggested {} (weight: {})",
                evaluation.evaluator_name(),
                evaluation.decision(),
                fmt_num(evaluation.weight())
            ));
        }
    }

    lines
}

// ──────────────────────────────────────────────
// Builder
// ──────────────────────────────────────────────

#[derive(Default)]
pub struct AgentBuilder {
    evaluators: Vec<Arc<dyn Evaluator>>,
    scoring: Option<Arc<dyn ScoringStrategy>>,
    audit: Option<Arc<dyn AuditSink>>,
    validate: Option<bool>,
    cache: Option<Arc<HashCache>>,
}

impl AgentBuilder {
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    pub fn evaluators(mut self, evaluators: Vec<Arc<dyn Evaluator>>) -> Self {
        self.evaluators.extend(evaluators);
        self
    }

    pub fn scoring(mut self, scoring: Arc<dyn ScoringStrategy>) -> Self {
        self.scoring = Some(scoring);
        self
    }

    pub fn audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Override the environment-derived validation default.
    pub fn validation(mut self, on: bool) -> Self {
        self.validate = Some(on);
        self
    }

    /// Use an instance-scoped hash cache instead of the process-wide
    /// one.
    pub fn hash_cache(mut self, cache: Arc<HashCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<Agent, EngineError> {
        if self.evaluators.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "at least one evaluator is required".into(),
            ));
        }
        let validate = self.validate.unwrap_or_else(|| {
            std::env::var(ENV_FLAG)
                .map(|v| v != "production")
                .unwrap_or(true)
        });
        Ok(Agent {
            evaluators: self.evaluators,
            scoring: self.scoring.unwrap_or_else(|| Arc::new(WeightedAverage)),
            audit: self.audit.unwrap_or_else(|| Arc::new(NoopAuditSink)),
            validate,
            cache: self.cache,
        })
    }
}
