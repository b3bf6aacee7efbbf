//! Value objects carried through the pipeline, and the engine error
//! taxonomy.

use serde::Serialize;
use serde_json::{Map, Value};

use arbiter_core::ParseError;
use arbiter_storage::StorageError;

/// Errors surfaced by the evaluation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Bad input shape: weight or confidence out of range, malformed
    /// ruleset, empty decision string.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The agent was assembled without the pieces it needs.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Every evaluator failed or abstained.
    #[error("no evaluations were produced")]
    NoEvaluations,

    /// Expression source failed to tokenize or parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Scoring or another pipeline stage failed at runtime.
    #[error("evaluation failed: {0}")]
    Eval(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ──────────────────────────────────────────────
// Evaluation
// ──────────────────────────────────────────────

/// A single evaluator's judgment. Immutable after construction; the
/// weight is validated into [0, 1] up front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    decision: String,
    weight: f64,
    reason: String,
    evaluator_name: String,
    metadata: Map<String, Value>,
}

impl Evaluation {
    pub fn new(
        decision: impl Into<String>,
        weight: f64,
        reason: impl Into<String>,
        evaluator_name: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> Result<Self, EngineError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(EngineError::Validation(format!(
                "weight must be within [0, 1], got {}",
                weight
            )));
        }
        let decision = decision.into();
        if decision.is_empty() {
            return Err(EngineError::Validation("decision must not be empty".into()));
        }
        Ok(Evaluation {
            decision,
            weight,
            reason: reason.into(),
            evaluator_name: evaluator_name.into(),
            metadata,
        })
    }

    pub fn decision(&self) -> &str {
        &self.decision
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn evaluator_name(&self) -> &str {
        &self.evaluator_name
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

// ──────────────────────────────────────────────
// Decision
// ──────────────────────────────────────────────

/// The final aggregated result of a `decide` call.
///
/// Equality allows a small tolerance on confidence so that decisions
/// recomputed through different float paths still compare equal.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    decision: String,
    confidence: f64,
    explanations: Vec<String>,
    evaluations: Vec<Evaluation>,
    audit_payload: Map<String, Value>,
}

pub(crate) const CONFIDENCE_TOLERANCE: f64 = 1e-4;

impl Decision {
    pub(crate) fn new(
        decision: String,
        confidence: f64,
        explanations: Vec<String>,
        evaluations: Vec<Evaluation>,
        audit_payload: Map<String, Value>,
    ) -> Result<Self, EngineError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EngineError::Validation(format!(
                "confidence must be within [0, 1], got {}",
                confidence
            )));
        }
        Ok(Decision {
            decision,
            confidence,
            explanations,
            evaluations,
            audit_payload,
        })
    }

    pub fn decision(&self) -> &str {
        &self.decision
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn explanations(&self) -> &[String] {
        &self.explanations
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    pub fn audit_payload(&self) -> &Map<String, Value> {
        &self.audit_payload
    }

    /// The canonical hash recorded in the audit payload.
    pub fn audit_hash(&self) -> Option<&str> {
        self.audit_payload.get("audit_hash").and_then(Value::as_str)
    }
}

impl PartialEq for Decision {
    fn eq(&self, other: &Self) -> bool {
        self.decision == other.decision
            && (self.confidence - other.confidence).abs() <= CONFIDENCE_TOLERANCE
            && self.explanations == other.explanations
            && self.evaluations == other.evaluations
            && self.audit_payload == other.audit_payload
    }
}
