//! Decision-tree evaluator.
//!
//! Nodes carry an optional FEEL condition and an optional outcome.
//! Traversal tries conditioned children in declaration order and
//! descends into the first whose condition holds. A condition that
//! fails to parse or evaluate skips that branch only -- the rest of
//! the tree still gets its chance.
//!
//! A child without a condition is the default branch. It is taken
//! when the node has no conditioned children at all, or when at least
//! one conditioned sibling evaluated cleanly and none matched; if
//! every conditioned sibling errored, there is no defensible default
//! and the evaluator abstains. A conditioned child whose children are
//! all condition-less leaves is an if/else: its first leaf is the
//! true branch and its second the false branch.

use serde::Deserialize;
use serde_json::{Map, Value};

use arbiter_core::{parse, Expr, ParseError};

use crate::context::Context;
use crate::evaluator::Evaluator;
use crate::interp::eval;
use crate::types::{EngineError, Evaluation};

/// Tree shape as it appears in rule content JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

struct CompiledNode {
    id: Option<String>,
    /// Parse failures are kept: such a branch always skips.
    condition: Option<Result<Expr, ParseError>>,
    decision: Option<String>,
    weight: Option<f64>,
    reason: Option<String>,
    children: Vec<CompiledNode>,
}

impl CompiledNode {
    fn compile(node: TreeNode) -> Self {
        CompiledNode {
            id: node.id,
            condition: node.condition.map(|src| parse(&src)),
            decision: node.decision,
            weight: node.weight,
            reason: node.reason,
            children: node.children.into_iter().map(Self::compile).collect(),
        }
    }

    fn is_plain_leaf(&self) -> bool {
        self.condition.is_none() && self.children.is_empty()
    }
}

pub struct DecisionTreeEvaluator {
    name: String,
    root: CompiledNode,
}

impl DecisionTreeEvaluator {
    pub fn new(name: impl Into<String>, root: TreeNode) -> Self {
        DecisionTreeEvaluator {
            name: name.into(),
            root: CompiledNode::compile(root),
        }
    }

    /// Build from rule content JSON: either `{"root": {...}}` or the
    /// root node object itself.
    pub fn from_value(name: impl Into<String>, value: Value) -> Result<Self, EngineError> {
        let node_value = match &value {
            Value::Object(map) if map.contains_key("root") => map["root"].clone(),
            _ => value,
        };
        let root: TreeNode = serde_json::from_value(node_value)
            .map_err(|e| EngineError::Validation(format!("invalid decision tree: {}", e)))?;
        Ok(Self::new(name, root))
    }

    fn traverse<'a>(&'a self, node: &'a CompiledNode, context: &Context) -> Option<&'a CompiledNode> {
        if node.children.is_empty() {
            return Some(node);
        }

        let mut evaluated_any = false;
        let mut has_conditioned = false;
        for child in &node.children {
            let condition = match &child.condition {
                Some(condition) => condition,
                None => continue,
            };
            has_conditioned = true;
            let expr = match condition {
                Ok(expr) => expr,
                Err(_) => continue,
            };
            match eval(expr, context) {
                Ok(Value::Bool(true)) => return self.descend(child, context),
                Ok(Value::Bool(false)) => {
                    evaluated_any = true;
                    // If/else shape: the second condition-less leaf is
                    // this child's explicit false branch.
                    if child.children.len() >= 2
                        && child.children.iter().all(CompiledNode::is_plain_leaf)
                    {
                        return Some(&child.children[1]);
                    }
                }
                // Non-boolean results and evaluation errors skip the
                // branch.
                Ok(_) | Err(_) => {}
            }
        }

        if let Some(default) = node.children.iter().find(|c| c.condition.is_none()) {
            if !has_conditioned || evaluated_any {
                return self.traverse(default, context);
            }
        }
        None
    }

    fn descend<'a>(&'a self, child: &'a CompiledNode, context: &Context) -> Option<&'a CompiledNode> {
        if child.children.is_empty() {
            return Some(child);
        }
        if child.children.iter().all(CompiledNode::is_plain_leaf) {
            // True branch of an if/else node.
            return Some(&child.children[0]);
        }
        self.traverse(child, context)
    }
}

impl Evaluator for DecisionTreeEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(
        &self,
        context: &Context,
        _feedback: &Map<String, Value>,
    ) -> Result<Option<Evaluation>, EngineError> {
        let outcome = match self.traverse(&self.root, context) {
            Some(node) => node,
            None => return Ok(None),
        };
        let decision = match &outcome.decision {
            Some(decision) => decision.clone(),
            None => return Ok(None),
        };

        let mut metadata = Map::new();
        metadata.insert(
            "type".to_string(),
            Value::String("decision_tree".to_string()),
        );
        if let Some(id) = &outcome.id {
            metadata.insert("node_id".to_string(), Value::String(id.clone()));
        }
        let evaluation = Evaluation::new(
            decision,
            outcome.weight.unwrap_or(1.0),
            outcome
                .reason
                .clone()
                .unwrap_or_else(|| "Decision tree matched".to_string()),
            self.name.clone(),
            metadata,
        )?;
        Ok(Some(evaluation))
    }
}
