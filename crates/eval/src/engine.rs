//! Engine facade: resolves A/B assignments to rule versions, builds
//! evaluators from version content, and runs the agent pipeline.

use std::sync::Arc;

use serde_json::{Map, Value};

use arbiter_storage::{ABTestAssignment, ABTestManager, VersionStore};

use crate::agent::Agent;
use crate::audit::{AuditSink, NoopAuditSink};
use crate::context::Context;
use crate::evaluator::{Evaluator, JsonRuleEvaluator};
use crate::ruleset::Ruleset;
use crate::scoring::{ScoringStrategy, WeightedAverage};
use crate::tree::DecisionTreeEvaluator;
use crate::types::{Decision, EngineError};

/// A decision plus the A/B assignment that routed it, when one was in
/// play.
pub struct EngineOutcome {
    pub decision: Decision,
    pub assignment: Option<ABTestAssignment>,
}

pub struct DecisionEngine {
    versions: Arc<dyn VersionStore>,
    abtests: Arc<ABTestManager>,
    scoring: Arc<dyn ScoringStrategy>,
    audit: Arc<dyn AuditSink>,
    default_evaluators: Vec<Arc<dyn Evaluator>>,
}

impl DecisionEngine {
    pub fn new(versions: Arc<dyn VersionStore>, abtests: Arc<ABTestManager>) -> Self {
        DecisionEngine {
            versions,
            abtests,
            scoring: Arc::new(WeightedAverage),
            audit: Arc::new(NoopAuditSink),
            default_evaluators: Vec::new(),
        }
    }

    pub fn with_scoring(mut self, scoring: Arc<dyn ScoringStrategy>) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Evaluators used when no A/B test routes the call.
    pub fn with_default_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.default_evaluators.push(evaluator);
        self
    }

    /// Decide over a context. With an `ab_test_id`, the call is routed
    /// through variant assignment: the assigned rule version supplies
    /// the evaluator, and the decision outcome is recorded back onto
    /// the assignment.
    pub fn decide(
        &self,
        context: Value,
        feedback: &Map<String, Value>,
        ab_test_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<EngineOutcome, EngineError> {
        let context = Context::new(context);

        let Some(test_id) = ab_test_id else {
            let agent = self.agent(self.default_evaluators.clone())?;
            let decision = agent.decide(context, feedback)?;
            return Ok(EngineOutcome {
                decision,
                assignment: None,
            });
        };

        let assignment = self
            .abtests
            .assign(test_id, user_id, context.as_map().clone())?;
        let version = self.versions.get_version(&assignment.version_id)?;
        let evaluator = evaluator_from_content(&version.rule_id, &version.content)?;

        let agent = self.agent(vec![evaluator])?;
        let decision = agent.decide(context, feedback)?;
        self.abtests
            .record_decision(&assignment.id, decision.decision(), decision.confidence())?;

        Ok(EngineOutcome {
            decision,
            assignment: Some(assignment),
        })
    }

    fn agent(&self, evaluators: Vec<Arc<dyn Evaluator>>) -> Result<Agent, EngineError> {
        Agent::builder()
            .evaluators(evaluators)
            .scoring(self.scoring.clone())
            .audit_sink(self.audit.clone())
            .build()
    }
}

/// Build an evaluator from rule version content: a ruleset mapping
/// (with a `rules` list) or a decision tree (with a `root` node or
/// top-level `children`).
pub fn evaluator_from_content(
    rule_id: &str,
    content: &Map<String, Value>,
) -> Result<Arc<dyn Evaluator>, EngineError> {
    if content.contains_key("rules") {
        let ruleset = Ruleset::from_value(Value::Object(content.clone()))?;
        return Ok(Arc::new(JsonRuleEvaluator::new(ruleset)));
    }
    if content.contains_key("root") || content.contains_key("children") {
        let tree = DecisionTreeEvaluator::from_value(
            format!("tree:{}", rule_id),
            Value::Object(content.clone()),
        )?;
        return Ok(Arc::new(tree));
    }
    Err(EngineError::Validation(format!(
        "rule '{}' content is neither a ruleset nor a decision tree",
        rule_id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_storage::{
        MemoryAssignmentStore, MemoryVersionStore, NewTest, TrafficSplit, VersionMeta,
    };
    use serde_json::json;
    use time::{Duration, OffsetDateTime};

    fn ruleset_content(decision: &str) -> Map<String, Value> {
        json!({
            "version": "1.0",
            "ruleset": "approvals",
            "rules": [{
                "id": "hv",
                "if": {"field": "amount", "op": "gt", "value": 1000},
                "then": {"decision": decision, "weight": 0.9, "reason": "High value"}
            }]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn engine_with_test() -> (DecisionEngine, String) {
        let versions = Arc::new(MemoryVersionStore::new());
        let champion = versions
            .create_version("rule1", ruleset_content("approve"), VersionMeta::default())
            .unwrap();
        let challenger = versions
            .create_version("rule1", ruleset_content("review"), VersionMeta::default())
            .unwrap();
        let abtests = Arc::new(ABTestManager::new(
            versions.clone(),
            Arc::new(MemoryAssignmentStore::new()),
        ));
        let test = abtests
            .create_test(NewTest {
                id: None,
                name: "routing".to_string(),
                champion_version_id: champion.id,
                challenger_version_id: challenger.id,
                traffic_split: TrafficSplit {
                    champion: 100,
                    challenger: 0,
                },
                start_date: OffsetDateTime::now_utc() - Duration::hours(1),
                end_date: None,
            })
            .unwrap();
        abtests.start(&test.id).unwrap();
        (DecisionEngine::new(versions, abtests), test.id)
    }

    #[test]
    fn routed_decision_uses_version_content_and_records_outcome() {
        let (engine, test_id) = engine_with_test();
        let outcome = engine
            .decide(
                json!({"amount": 1500}),
                &Map::new(),
                Some(&test_id),
                Some("u-1"),
            )
            .unwrap();
        assert_eq!(outcome.decision.decision(), "approve");
        let assignment = outcome.assignment.unwrap();
        // The outcome is recorded onto the stored assignment.
        let results = engine.abtests.get_results(&test_id).unwrap();
        assert_eq!(results.champion.decisions["approve"], 1);
        assert!(assignment.user_id.is_some());
    }

    #[test]
    fn unrouted_decide_needs_default_evaluators() {
        let (engine, _) = engine_with_test();
        assert!(matches!(
            engine.decide(json!({}), &Map::new(), None, None),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn content_dispatch() {
        let ruleset = evaluator_from_content("r", &ruleset_content("approve")).unwrap();
        assert_eq!(ruleset.name(), "json_rules");

        let tree_content = json!({
            "root": {"children": [{"decision": "ok"}]}
        })
        .as_object()
        .cloned()
        .unwrap();
        let tree = evaluator_from_content("r", &tree_content).unwrap();
        assert_eq!(tree.name(), "tree:r");

        let bogus = json!({"something": 1}).as_object().cloned().unwrap();
        assert!(matches!(
            evaluator_from_content("r", &bogus),
            Err(EngineError::Validation(_))
        ));
    }
}
