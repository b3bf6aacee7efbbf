//! Validation and reporting layer over a [`VersionStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::record::{RuleVersion, VersionMeta, VersionStatus};
use crate::traits::VersionStore;

/// A shallow per-key difference between two version contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VersionDiff {
    /// Keys present only in the newer version.
    pub added: Map<String, Value>,
    /// Keys present only in the older version.
    pub removed: Map<String, Value>,
    /// Keys present in both with different values.
    pub changed: BTreeMap<String, ChangedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangedValue {
    pub from: Value,
    pub to: Value,
}

/// One line of a rule's history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub version_number: u32,
    pub status: VersionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Option<String>,
    pub changelog: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionHistory {
    pub rule_id: String,
    pub total_versions: usize,
    pub active_version_number: Option<u32>,
    pub entries: Vec<HistoryEntry>,
}

/// Input-validating facade over a version store.
pub struct VersionManager {
    store: Arc<dyn VersionStore>,
}

impl VersionManager {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        VersionManager { store }
    }

    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// Create a version after validating the input shape. The
    /// changelog defaults to `"Version N"` when not supplied.
    pub fn create_version(
        &self,
        rule_id: &str,
        content: Map<String, Value>,
        meta: VersionMeta,
    ) -> Result<RuleVersion, StorageError> {
        if rule_id.trim().is_empty() {
            return Err(StorageError::Validation("rule_id must not be empty".into()));
        }
        if content.is_empty() {
            return Err(StorageError::Validation(
                "version content must be a non-empty mapping".into(),
            ));
        }
        self.store.create_version(rule_id, content, meta)
    }

    pub fn get_active_version(&self, rule_id: &str) -> Result<Option<RuleVersion>, StorageError> {
        self.store.get_active_version(rule_id)
    }

    pub fn activate_version(&self, id: &str) -> Result<RuleVersion, StorageError> {
        self.store.activate_version(id)
    }

    pub fn delete_version(&self, id: &str) -> Result<(), StorageError> {
        self.store.delete_version(id)
    }

    /// Shallow per-key comparison of two versions of the same rule.
    pub fn compare(
        &self,
        rule_id: &str,
        from_number: u32,
        to_number: u32,
    ) -> Result<VersionDiff, StorageError> {
        let from = self.store.get_version_by_number(rule_id, from_number)?;
        let to = self.store.get_version_by_number(rule_id, to_number)?;

        let mut diff = VersionDiff::default();
        for (key, to_value) in &to.content {
            match from.content.get(key) {
                None => {
                    diff.added.insert(key.clone(), to_value.clone());
                }
                Some(from_value) if from_value != to_value => {
                    diff.changed.insert(
                        key.clone(),
                        ChangedValue {
                            from: from_value.clone(),
                            to: to_value.clone(),
                        },
                    );
                }
                Some(_) => {}
            }
        }
        for (key, from_value) in &from.content {
            if !to.content.contains_key(key) {
                diff.removed.insert(key.clone(), from_value.clone());
            }
        }
        Ok(diff)
    }

    /// History aggregate, newest version first.
    pub fn get_history(&self, rule_id: &str) -> Result<VersionHistory, StorageError> {
        let versions = self.store.list_versions(rule_id, None)?;
        let active_version_number = versions
            .iter()
            .find(|v| v.status == VersionStatus::Active)
            .map(|v| v.version_number);
        let entries = versions
            .iter()
            .map(|v| HistoryEntry {
                version_number: v.version_number,
                status: v.status,
                created_at: v.created_at,
                created_by: v.created_by.clone(),
                changelog: v.changelog.clone(),
            })
            .collect();
        Ok(VersionHistory {
            rule_id: rule_id.to_string(),
            total_versions: versions.len(),
            active_version_number,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryVersionStore;

    fn manager() -> VersionManager {
        VersionManager::new(Arc::new(MemoryVersionStore::new()))
    }

    fn content(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn rejects_empty_content() {
        let m = manager();
        let err = m
            .create_version("r1", Map::new(), VersionMeta::default())
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn rejects_blank_rule_id() {
        let m = manager();
        let err = m
            .create_version("  ", content(&[("a", Value::Null)]), VersionMeta::default())
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn compare_reports_added_removed_changed() {
        let m = manager();
        m.create_version(
            "r1",
            content(&[
                ("threshold", Value::from(100)),
                ("legacy", Value::Bool(true)),
            ]),
            VersionMeta::default(),
        )
        .unwrap();
        m.create_version(
            "r1",
            content(&[
                ("threshold", Value::from(250)),
                ("mode", Value::String("strict".into())),
            ]),
            VersionMeta::default(),
        )
        .unwrap();

        let diff = m.compare("r1", 1, 2).unwrap();
        assert!(diff.added.contains_key("mode"));
        assert!(diff.removed.contains_key("legacy"));
        let changed = &diff.changed["threshold"];
        assert_eq!(changed.from, Value::from(100));
        assert_eq!(changed.to, Value::from(250));
    }

    #[test]
    fn history_reports_active_number() {
        let m = manager();
        for i in 0..3 {
            m.create_version(
                "r1",
                content(&[("n", Value::from(i))]),
                VersionMeta::default(),
            )
            .unwrap();
        }
        let history = m.get_history("r1").unwrap();
        assert_eq!(history.total_versions, 3);
        assert_eq!(history.active_version_number, Some(3));
        assert_eq!(history.entries[0].version_number, 3);
    }
}
