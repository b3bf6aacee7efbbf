//! The evaluator seam and the JSON rule evaluator.
//!
//! An evaluator inspects the context and either produces a judgment or
//! abstains. The JSON rule evaluator walks its ruleset in declaration
//! order and returns the first rule whose condition matches.

use regex::Regex;
use serde_json::{Map, Value};

use crate::context::Context;
use crate::explain::{ConditionTrace, RuleTrace, EXPLAINABILITY_KEY};
use crate::ruleset::{Condition, Operator, Ruleset};
use crate::types::{EngineError, Evaluation};

/// The capability the agent pipeline consumes.
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Produce a judgment for the context, or None to abstain.
    fn evaluate(
        &self,
        context: &Context,
        feedback: &Map<String, Value>,
    ) -> Result<Option<Evaluation>, EngineError>;
}

// ──────────────────────────────────────────────
// JSON rule evaluator
// ──────────────────────────────────────────────

pub struct JsonRuleEvaluator {
    name: String,
    ruleset: Ruleset,
}

impl JsonRuleEvaluator {
    pub fn new(ruleset: Ruleset) -> Self {
        JsonRuleEvaluator {
            name: "json_rules".to_string(),
            ruleset,
        }
    }

    pub fn with_name(name: impl Into<String>, ruleset: Ruleset) -> Self {
        JsonRuleEvaluator {
            name: name.into(),
            ruleset,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(Self::new(Ruleset::from_json(json)?))
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }
}

impl Evaluator for JsonRuleEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(
        &self,
        context: &Context,
        _feedback: &Map<String, Value>,
    ) -> Result<Option<Evaluation>, EngineError> {
        let mut rule_traces: Vec<RuleTrace> = Vec::new();

        for rule in &self.ruleset.rules {
            let mut condition_traces = Vec::new();
            let matched = eval_condition(&rule.condition, context, &mut condition_traces);
            let weight = rule.then.weight.unwrap_or(1.0);
            let reason = rule
                .then
                .reason
                .clone()
                .unwrap_or_else(|| "Rule matched".to_string());
            rule_traces.push(RuleTrace {
                rule_id: rule.id.clone(),
                matched,
                condition_traces,
                decision: rule.then.decision.clone(),
                weight,
                reason: reason.clone(),
            });

            if matched {
                let mut metadata = Map::new();
                metadata.insert("type".to_string(), Value::String("json_rule".to_string()));
                metadata.insert("rule_id".to_string(), Value::String(rule.id.clone()));
                metadata.insert(
                    "ruleset".to_string(),
                    Value::String(self.ruleset.ruleset.clone()),
                );
                if let Ok(traces) = serde_json::to_value(&rule_traces) {
                    metadata.insert(EXPLAINABILITY_KEY.to_string(), traces);
                }
                let evaluation = Evaluation::new(
                    rule.then.decision.clone(),
                    weight,
                    reason,
                    self.name.clone(),
                    metadata,
                )?;
                return Ok(Some(evaluation));
            }
        }

        Ok(None)
    }
}

// ──────────────────────────────────────────────
// Condition semantics
// ──────────────────────────────────────────────

fn eval_condition(
    condition: &Condition,
    context: &Context,
    traces: &mut Vec<ConditionTrace>,
) -> bool {
    match condition {
        // Empty conjunction is vacuously true.
        Condition::All { all } => all.iter().all(|c| eval_condition(c, context, traces)),
        // Empty disjunction is vacuously false.
        Condition::Any { any } => any.iter().any(|c| eval_condition(c, context, traces)),
        Condition::Field { field, op, value } => {
            let actual = context.resolve(field);
            let result = eval_field(actual, *op, value.as_ref());
            traces.push(ConditionTrace {
                field: field.clone(),
                operator: op.as_str().to_string(),
                expected_value: value.clone(),
                actual_value: actual.cloned(),
                result,
            });
            result
        }
    }
}

fn eval_field(actual: Option<&Value>, op: Operator, expected: Option<&Value>) -> bool {
    match op {
        Operator::Eq => match (actual, expected) {
            (Some(a), Some(e)) => loose_eq(a, e),
            _ => false,
        },
        Operator::Ne => match (actual, expected) {
            (Some(a), Some(e)) => !loose_eq(a, e),
            // An absent value differs from any expectation.
            (None, Some(_)) => true,
            _ => false,
        },
        Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
            // Non-numeric operands make ordering comparisons false,
            // not errors.
            match (actual.and_then(as_num), expected.and_then(as_num)) {
                (Some(a), Some(e)) => match op {
                    Operator::Gt => a > e,
                    Operator::Ge => a >= e,
                    Operator::Lt => a < e,
                    _ => a <= e,
                },
                _ => false,
            }
        }
        Operator::In => match (actual, expected) {
            (Some(a), Some(Value::Array(list))) => list.iter().any(|item| loose_eq(a, item)),
            _ => false,
        },
        Operator::Contains => match (actual, expected) {
            (Some(Value::Array(list)), Some(e)) => list.iter().any(|item| loose_eq(item, e)),
            (Some(Value::String(haystack)), Some(Value::String(needle))) => {
                haystack.contains(needle.as_str())
            }
            _ => false,
        },
        Operator::Present => actual.map(is_non_empty).unwrap_or(false),
        Operator::Blank => actual.map(|v| !is_non_empty(v)).unwrap_or(true),
        Operator::Matches => match (actual, expected) {
            (Some(Value::String(text)), Some(Value::String(pattern))) => {
                // An invalid pattern fails the match rather than the
                // whole evaluation.
                Regex::new(pattern)
                    .map(|re| re.is_match(text))
                    .unwrap_or(false)
            }
            _ => false,
        },
    }
}

/// Structural equality with number normalization: integers compare
/// equal to their float value, recursively through containers.
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => match (as_num(a), as_num(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| loose_eq(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

pub(crate) fn as_num(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Non-null and, for containers and strings, non-empty.
fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(xs) => !xs.is_empty(),
        Value::Object(m) => !m.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

// ──────────────────────────────────────────────
// Static evaluator
// ──────────────────────────────────────────────

/// Always returns the same judgment. Useful for pinning a baseline
/// vote next to rule-driven evaluators, and in tests.
pub struct StaticEvaluator {
    name: String,
    decision: String,
    weight: f64,
    reason: String,
}

impl StaticEvaluator {
    pub fn new(
        name: impl Into<String>,
        decision: impl Into<String>,
        weight: f64,
        reason: impl Into<String>,
    ) -> Self {
        StaticEvaluator {
            name: name.into(),
            decision: decision.into(),
            weight,
            reason: reason.into(),
        }
    }
}

impl Evaluator for StaticEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(
        &self,
        _context: &Context,
        _feedback: &Map<String, Value>,
    ) -> Result<Option<Evaluation>, EngineError> {
        let mut metadata = Map::new();
        metadata.insert("type".to_string(), Value::String("static".to_string()));
        Ok(Some(Evaluation::new(
            self.decision.clone(),
            self.weight,
            self.reason.clone(),
            self.name.clone(),
            metadata,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::traces_of;
    use serde_json::json;

    fn evaluator(rules: Value) -> JsonRuleEvaluator {
        JsonRuleEvaluator::new(
            Ruleset::from_value(json!({
                "version": "1.0",
                "ruleset": "test",
                "rules": rules
            }))
            .unwrap(),
        )
    }

    fn ctx(value: Value) -> Context {
        Context::new(value)
    }

    fn run(e: &JsonRuleEvaluator, context: Value) -> Option<Evaluation> {
        e.evaluate(&ctx(context), &Map::new()).unwrap()
    }

    #[test]
    fn first_match_wins() {
        let e = evaluator(json!([
            {"id": "a", "if": {"field": "x", "op": "gt", "value": 10},
             "then": {"decision": "approve", "weight": 0.5}},
            {"id": "b", "if": {"field": "x", "op": "gt", "value": 0},
             "then": {"decision": "reject", "weight": 0.9}}
        ]));
        let evaluation = run(&e, json!({"x": 50})).unwrap();
        assert_eq!(evaluation.decision(), "approve");
        assert_eq!(evaluation.metadata()["rule_id"], json!("a"));
    }

    #[test]
    fn no_match_abstains() {
        let e = evaluator(json!([
            {"id": "a", "if": {"field": "x", "op": "gt", "value": 10},
             "then": {"decision": "approve"}}
        ]));
        assert!(run(&e, json!({"x": 3})).is_none());
    }

    #[test]
    fn defaults_for_weight_and_reason() {
        let e = evaluator(json!([
            {"id": "a", "if": {"field": "x", "op": "present"},
             "then": {"decision": "approve"}}
        ]));
        let evaluation = run(&e, json!({"x": 1})).unwrap();
        assert_eq!(evaluation.weight(), 1.0);
        assert_eq!(evaluation.reason(), "Rule matched");
    }

    #[test]
    fn dotted_paths_traverse_nested_maps() {
        let e = evaluator(json!([
            {"id": "admin", "if": {"field": "user.role", "op": "eq", "value": "admin"},
             "then": {"decision": "approve"}}
        ]));
        assert!(run(&e, json!({"user": {"role": "admin"}})).is_some());
        assert!(run(&e, json!({"user": {"role": "viewer"}})).is_none());
        assert!(run(&e, json!({"role": "admin"})).is_none());
    }

    #[test]
    fn numbers_normalize_in_equality() {
        let e = evaluator(json!([
            {"id": "a", "if": {"field": "n", "op": "eq", "value": 2},
             "then": {"decision": "yes"}}
        ]));
        assert!(run(&e, json!({"n": 2.0})).is_some());
    }

    #[test]
    fn ordering_on_non_numeric_is_false() {
        let e = evaluator(json!([
            {"id": "a", "if": {"field": "n", "op": "gt", "value": 5},
             "then": {"decision": "yes"}}
        ]));
        assert!(run(&e, json!({"n": "high"})).is_none());
    }

    #[test]
    fn in_and_contains_are_symmetric() {
        let in_rule = evaluator(json!([
            {"id": "a", "if": {"field": "role", "op": "in", "value": ["admin", "owner"]},
             "then": {"decision": "yes"}}
        ]));
        assert!(run(&in_rule, json!({"role": "owner"})).is_some());
        assert!(run(&in_rule, json!({"role": "guest"})).is_none());

        let contains_list = evaluator(json!([
            {"id": "a", "if": {"field": "tags", "op": "contains", "value": "vip"},
             "then": {"decision": "yes"}}
        ]));
        assert!(run(&contains_list, json!({"tags": ["new", "vip"]})).is_some());

        let contains_str = evaluator(json!([
            {"id": "a", "if": {"field": "note", "op": "contains", "value": "urgent"},
             "then": {"decision": "yes"}}
        ]));
        assert!(run(&contains_str, json!({"note": "very urgent case"})).is_some());
    }

    #[test]
    fn present_and_blank_boundaries() {
        let present = evaluator(json!([
            {"id": "a", "if": {"field": "v", "op": "present"}, "then": {"decision": "yes"}}
        ]));
        assert!(run(&present, json!({"v": 0})).is_some());
        assert!(run(&present, json!({"v": null})).is_none());
        assert!(run(&present, json!({"v": ""})).is_none());
        assert!(run(&present, json!({"v": []})).is_none());
        assert!(run(&present, json!({})).is_none());

        let blank = evaluator(json!([
            {"id": "a", "if": {"field": "v", "op": "blank"}, "then": {"decision": "yes"}}
        ]));
        assert!(run(&blank, json!({"v": null})).is_some());
        assert!(run(&blank, json!({"v": ""})).is_some());
        assert!(run(&blank, json!({"v": {}})).is_some());
        assert!(run(&blank, json!({})).is_some());
        assert!(run(&blank, json!({"v": "x"})).is_none());
    }

    #[test]
    fn matches_with_invalid_regex_is_false() {
        let e = evaluator(json!([
            {"id": "a", "if": {"field": "s", "op": "matches", "value": "([unclosed"},
             "then": {"decision": "yes"}}
        ]));
        assert!(run(&e, json!({"s": "anything"})).is_none());

        let ok = evaluator(json!([
            {"id": "a", "if": {"field": "s", "op": "matches", "value": "^ord-[0-9]+$"},
             "then": {"decision": "yes"}}
        ]));
        assert!(run(&ok, json!({"s": "ord-42"})).is_some());
        assert!(run(&ok, json!({"s": "ord-"})).is_none());
    }

    #[test]
    fn empty_composites() {
        let all = evaluator(json!([
            {"id": "a", "if": {"all": []}, "then": {"decision": "yes"}}
        ]));
        assert!(run(&all, json!({})).is_some());

        let any = evaluator(json!([
            {"id": "a", "if": {"any": []}, "then": {"decision": "yes"}}
        ]));
        assert!(run(&any, json!({})).is_none());
    }

    #[test]
    fn traces_cover_all_tried_rules() {
        let e = evaluator(json!([
            {"id": "first", "if": {"field": "x", "op": "gt", "value": 100},
             "then": {"decision": "reject"}},
            {"id": "second", "if": {"field": "x", "op": "gt", "value": 1},
             "then": {"decision": "approve"}}
        ]));
        let evaluation = run(&e, json!({"x": 10})).unwrap();
        let traces = traces_of(&evaluation);
        assert_eq!(traces.len(), 2);
        assert!(!traces[0].matched);
        assert!(traces[1].matched);
        assert_eq!(traces[1].condition_traces[0].actual_value, Some(json!(10)));
    }

    #[test]
    fn static_evaluator_always_votes() {
        let e = StaticEvaluator::new("baseline", "reject", 0.3, "default stance");
        let evaluation = e.evaluate(&ctx(json!({})), &Map::new()).unwrap().unwrap();
        assert_eq!(evaluation.decision(), "reject");
        assert_eq!(evaluation.weight(), 0.3);
    }
}
