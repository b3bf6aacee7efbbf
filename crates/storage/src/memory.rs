//! In-memory adapters. A single monitor-style lock guards all
//! operations, which makes every store method atomic; suitable for
//! tests and single-process embedding.

use std::sync::Mutex;

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StorageError;
use crate::record::{ABTestAssignment, RuleVersion, VersionMeta, VersionStatus};
use crate::traits::{AssignmentStore, VersionStore};

// ──────────────────────────────────────────────
// Versions
// ──────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryVersionStore {
    /// All versions in creation order.
    inner: Mutex<Vec<RuleVersion>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RuleVersion>> {
        // A poisoned lock means a panic mid-write; the data is
        // append-only records, safe to keep serving.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VersionStore for MemoryVersionStore {
    fn create_version(
        &self,
        rule_id: &str,
        content: Map<String, Value>,
        meta: VersionMeta,
    ) -> Result<RuleVersion, StorageError> {
        let mut versions = self.lock();
        let next = versions
            .iter()
            .filter(|v| v.rule_id == rule_id)
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0)
            + 1;
        for v in versions.iter_mut().filter(|v| v.rule_id == rule_id) {
            v.status = VersionStatus::Archived;
        }
        let version = RuleVersion {
            id: Uuid::new_v4().to_string(),
            rule_id: rule_id.to_string(),
            version_number: next,
            content,
            status: VersionStatus::Active,
            created_at: OffsetDateTime::now_utc(),
            created_by: meta.created_by,
            changelog: meta
                .changelog
                .unwrap_or_else(|| format!("Version {}", next)),
        };
        versions.push(version.clone());
        Ok(version)
    }

    fn list_versions(
        &self,
        rule_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RuleVersion>, StorageError> {
        let versions = self.lock();
        let mut out: Vec<RuleVersion> = versions
            .iter()
            .filter(|v| v.rule_id == rule_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn list_all_versions(&self, limit: Option<usize>) -> Result<Vec<RuleVersion>, StorageError> {
        let versions = self.lock();
        let mut out: Vec<RuleVersion> = versions.iter().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn get_version(&self, id: &str) -> Result<RuleVersion, StorageError> {
        self.lock()
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("version '{}'", id)))
    }

    fn get_version_by_number(
        &self,
        rule_id: &str,
        version_number: u32,
    ) -> Result<RuleVersion, StorageError> {
        self.lock()
            .iter()
            .find(|v| v.rule_id == rule_id && v.version_number == version_number)
            .cloned()
            .ok_or_else(|| {
                StorageError::NotFound(format!("version {} of rule '{}'", version_number, rule_id))
            })
    }

    fn get_active_version(&self, rule_id: &str) -> Result<Option<RuleVersion>, StorageError> {
        Ok(self
            .lock()
            .iter()
            .find(|v| v.rule_id == rule_id && v.status == VersionStatus::Active)
            .cloned())
    }

    fn activate_version(&self, id: &str) -> Result<RuleVersion, StorageError> {
        let mut versions = self.lock();
        let rule_id = versions
            .iter()
            .find(|v| v.id == id)
            .map(|v| v.rule_id.clone())
            .ok_or_else(|| StorageError::NotFound(format!("version '{}'", id)))?;
        let mut activated = None;
        for v in versions.iter_mut().filter(|v| v.rule_id == rule_id) {
            if v.id == id {
                v.status = VersionStatus::Active;
                activated = Some(v.clone());
            } else {
                v.status = VersionStatus::Archived;
            }
        }
        Ok(activated.expect("target version present"))
    }

    fn delete_version(&self, id: &str) -> Result<(), StorageError> {
        let mut versions = self.lock();
        let idx = versions
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| StorageError::NotFound(format!("version '{}'", id)))?;
        if versions[idx].status == VersionStatus::Active {
            return Err(StorageError::Validation(
                "cannot delete the active version".into(),
            ));
        }
        versions.remove(idx);
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Assignments
// ──────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryAssignmentStore {
    inner: Mutex<Vec<ABTestAssignment>>,
}

impl MemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ABTestAssignment>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AssignmentStore for MemoryAssignmentStore {
    fn insert(&self, assignment: ABTestAssignment) -> Result<(), StorageError> {
        self.lock().push(assignment);
        Ok(())
    }

    fn update(&self, assignment: &ABTestAssignment) -> Result<(), StorageError> {
        let mut all = self.lock();
        match all.iter_mut().find(|a| a.id == assignment.id) {
            Some(slot) => {
                *slot = assignment.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!(
                "assignment '{}'",
                assignment.id
            ))),
        }
    }

    fn get(&self, id: &str) -> Result<ABTestAssignment, StorageError> {
        self.lock()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("assignment '{}'", id)))
    }

    fn find_by_user(
        &self,
        test_id: &str,
        user_id: &str,
    ) -> Result<Option<ABTestAssignment>, StorageError> {
        Ok(self
            .lock()
            .iter()
            .find(|a| a.ab_test_id == test_id && a.user_id.as_deref() == Some(user_id))
            .cloned())
    }

    fn list_for_test(&self, test_id: &str) -> Result<Vec<ABTestAssignment>, StorageError> {
        Ok(self
            .lock()
            .iter()
            .filter(|a| a.ab_test_id == test_id)
            .cloned()
            .collect())
    }
}
