use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::record::{ABTestAssignment, RuleVersion, VersionMeta};

/// Append-only version history per rule.
///
/// ## Invariants
///
/// Implementations must uphold, even under concurrent callers:
///
/// - For each `rule_id` with at least one version, exactly one version
///   has active status.
/// - Version numbers per `rule_id` are assigned 1, 2, 3, ... with no
///   gaps, strictly increasing in creation order.
/// - `create_version` and `activate_version` are atomic per `rule_id`:
///   after either returns, `get_active_version` reflects the change.
///
/// Adapters serialize writes per `rule_id`; reads may proceed
/// concurrently with snapshot semantics.
///
/// ## Thread safety
///
/// Implementations are `Send + Sync` and shared behind `Arc`. All
/// operations block the calling thread.
pub trait VersionStore: Send + Sync {
    /// Append a new version: assigns the next version number, archives
    /// any existing active version, and persists the new version as
    /// active. A missing changelog defaults to `"Version N"`.
    fn create_version(
        &self,
        rule_id: &str,
        content: Map<String, Value>,
        meta: VersionMeta,
    ) -> Result<RuleVersion, StorageError>;

    /// Versions of one rule, descending by version number.
    fn list_versions(
        &self,
        rule_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RuleVersion>, StorageError>;

    /// Versions across all rules, descending by creation time.
    fn list_all_versions(&self, limit: Option<usize>) -> Result<Vec<RuleVersion>, StorageError>;

    fn get_version(&self, id: &str) -> Result<RuleVersion, StorageError>;

    fn get_version_by_number(
        &self,
        rule_id: &str,
        version_number: u32,
    ) -> Result<RuleVersion, StorageError>;

    /// The unique active version, or None when the rule has no
    /// versions at all.
    fn get_active_version(&self, rule_id: &str) -> Result<Option<RuleVersion>, StorageError>;

    /// Atomically make the target active and archive all other
    /// versions of the same rule. `NotFound` for unknown ids.
    fn activate_version(&self, id: &str) -> Result<RuleVersion, StorageError>;

    /// Remove an archived version. `Validation` error when the target
    /// is active, `NotFound` for unknown ids.
    fn delete_version(&self, id: &str) -> Result<(), StorageError>;
}

/// Persistence contract for A/B test variant assignments.
pub trait AssignmentStore: Send + Sync {
    fn insert(&self, assignment: ABTestAssignment) -> Result<(), StorageError>;

    /// Replace the stored record with the same id.
    fn update(&self, assignment: &ABTestAssignment) -> Result<(), StorageError>;

    fn get(&self, id: &str) -> Result<ABTestAssignment, StorageError>;

    /// The existing assignment for `(test_id, user_id)`, if any.
    fn find_by_user(
        &self,
        test_id: &str,
        user_id: &str,
    ) -> Result<Option<ABTestAssignment>, StorageError>;

    /// All assignments for a test, in insertion order.
    fn list_for_test(&self, test_id: &str) -> Result<Vec<ABTestAssignment>, StorageError>;
}
