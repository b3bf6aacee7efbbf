//! Rule-trace reconstruction: which rules matched, on which
//! conditions, and why the rest did not.
//!
//! Evaluators attach traces under the `explainability` metadata key.
//! Decisions flatten those traces on demand; missing or malformed
//! metadata yields empty output, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Decision, Evaluation};

/// Trace of one field predicate inside a rule condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTrace {
    pub field: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Value>,
    pub result: bool,
}

impl ConditionTrace {
    fn describe(&self) -> String {
        let expected = self
            .expected_value
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        let actual = self
            .actual_value
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_else(|| "absent".to_string());
        format!(
            "{} {} {} [actual: {} -> {}]",
            self.field, self.operator, expected, actual, self.result
        )
    }
}

/// Trace of one rule evaluation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTrace {
    pub rule_id: String,
    pub matched: bool,
    #[serde(default)]
    pub condition_traces: Vec<ConditionTrace>,
    pub decision: String,
    pub weight: f64,
    pub reason: String,
}

/// Metadata key evaluators attach traces under.
pub const EXPLAINABILITY_KEY: &str = "explainability";

/// Decode the traces attached to an evaluation. Absent or malformed
/// metadata yields an empty list.
pub fn traces_of(evaluation: &Evaluation) -> Vec<RuleTrace> {
    evaluation
        .metadata()
        .get(EXPLAINABILITY_KEY)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_default()
}

impl Decision {
    /// Human-readable lines for the rules that matched.
    pub fn because(&self, verbose: bool) -> Vec<String> {
        let mut lines = Vec::new();
        for evaluation in self.evaluations() {
            for trace in traces_of(evaluation).iter().filter(|t| t.matched) {
                if verbose {
                    let conditions: Vec<String> = trace
                        .condition_traces
                        .iter()
                        .map(ConditionTrace::describe)
                        .collect();
                    lines.push(format!(
                        "Rule '{}' matched => {} (weight: {}): {}",
                        trace.rule_id,
                        trace.decision,
                        trace.weight,
                        conditions.join(", ")
                    ));
                } else {
                    lines.push(format!(
                        "Rule '{}' matched: {}",
                        trace.rule_id, trace.reason
                    ));
                }
            }
        }
        lines
    }

    /// Human-readable lines for the rules that were tried and did not
    /// match.
    pub fn failed_conditions(&self, verbose: bool) -> Vec<String> {
        let mut lines = Vec::new();
        for evaluation in self.evaluations() {
            for trace in traces_of(evaluation).iter().filter(|t| !t.matched) {
                if verbose {
                    let failing: Vec<String> = trace
                        .condition_traces
                        .iter()
                        .filter(|c| !c.result)
                        .map(ConditionTrace::describe)
                        .collect();
                    lines.push(format!(
                        "Rule '{}' did not match: {}",
                        trace.rule_id,
                        failing.join(", ")
                    ));
                } else {
                    lines.push(format!("Rule '{}' did not match", trace.rule_id));
                }
            }
        }
        lines
    }
}
