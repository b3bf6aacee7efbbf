//! arbiter-eval: the decision-evaluation pipeline.
//!
//! Wraps input facts in an immutable [`Context`], runs a set of
//! evaluators (the JSON rule evaluator and the FEEL-driven decision
//! tree evaluator ship in-tree), folds their judgments through a
//! [`ScoringStrategy`], and emits an explainable, audit-hashed
//! [`Decision`].
//!
//! # Public API
//!
//! - [`Agent`] / [`AgentBuilder`] -- the pipeline itself
//! - [`DecisionEngine`] -- facade adding A/B routing over rule
//!   versions
//! - [`JsonRuleEvaluator`], [`DecisionTreeEvaluator`],
//!   [`StaticEvaluator`] -- bundled evaluators
//! - [`WeightedAverage`], [`MajorityVote`], [`HighestWeight`] --
//!   scoring strategies
//! - [`canonical`] -- RFC 8785 serialization and SHA-256 digests

pub mod agent;
pub mod audit;
pub mod canonical;
pub mod context;
pub mod engine;
pub mod evaluator;
pub mod explain;
pub mod interp;
pub mod ruleset;
pub mod scoring;
pub mod tree;
pub mod types;

pub use agent::{Agent, AgentBuilder, ENV_FLAG};
pub use audit::{AuditSink, HashCache, NoopAuditSink};
pub use context::Context;
pub use engine::{evaluator_from_content, DecisionEngine, EngineOutcome};
pub use evaluator::{Evaluator, JsonRuleEvaluator, StaticEvaluator};
pub use explain::{ConditionTrace, RuleTrace};
pub use interp::EvalError;
pub use ruleset::{Condition, Operator, Outcome, Rule, Ruleset};
pub use scoring::{HighestWeight, MajorityVote, Score, ScoringStrategy, WeightedAverage};
pub use tree::{DecisionTreeEvaluator, TreeNode};
pub use types::{Decision, EngineError, Evaluation};
