//! The JSON rule DSL: rulesets, rules, and boolean condition trees.
//!
//! Rule order is semantically significant -- evaluation stops at the
//! first rule whose condition matches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    pub version: String,
    pub ruleset: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(rename = "if")]
    pub condition: Condition,
    pub then: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A boolean condition tree. Composites short-circuit; leaves match a
/// dotted field path against an expected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    All {
        all: Vec<Condition>,
    },
    Any {
        any: Vec<Condition>,
    },
    Field {
        field: String,
        op: Operator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
}

/// Field predicate operators. Unknown operator strings fail
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    Contains,
    Present,
    Blank,
    Matches,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::In => "in",
            Operator::Contains => "contains",
            Operator::Present => "present",
            Operator::Blank => "blank",
            Operator::Matches => "matches",
        }
    }
}

impl Ruleset {
    /// Parse from JSON text and validate.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let ruleset: Ruleset = serde_json::from_str(json)
            .map_err(|e| EngineError::Validation(format!("invalid ruleset: {}", e)))?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Parse from an already-decoded JSON value and validate.
    pub fn from_value(value: Value) -> Result<Self, EngineError> {
        let ruleset: Ruleset = serde_json::from_value(value)
            .map_err(|e| EngineError::Validation(format!("invalid ruleset: {}", e)))?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    fn validate(&self) -> Result<(), EngineError> {
        for rule in &self.rules {
            if rule.id.is_empty() {
                return Err(EngineError::Validation("rule id must not be empty".into()));
            }
            if let Some(weight) = rule.then.weight {
                if !(0.0..=1.0).contains(&weight) {
                    return Err(EngineError::Validation(format!(
                        "rule '{}': weight must be within [0, 1], got {}",
                        rule.id, weight
                    )));
                }
            }
        }
        Ok(())
    }
}
