//! File-backed version store.
//!
//! Layout: `<root>/<rule_id>/<version_number>.json`, one JSON object
//! per version. Rule directories are created lazily on first write.
//! Writes are serialized per `rule_id`; reads parse whatever set of
//! version files is on disk at call time (snapshot semantics at file
//! granularity).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StorageError;
use crate::record::{RuleVersion, VersionMeta, VersionStatus};
use crate::traits::VersionStore;

pub struct FileVersionStore {
    root: PathBuf,
    /// One write lock per rule_id, allocated on first use.
    rule_locks: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
}

impl FileVersionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileVersionStore {
            root: root.into(),
            rule_locks: Mutex::new(BTreeMap::new()),
        }
    }

    fn rule_lock(&self, rule_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.rule_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(rule_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn rule_dir(&self, rule_id: &str) -> PathBuf {
        self.root.join(rule_id)
    }

    fn version_path(&self, rule_id: &str, version_number: u32) -> PathBuf {
        self.rule_dir(rule_id).join(format!("{}.json", version_number))
    }

    fn read_version_file(path: &Path) -> Result<RuleVersion, StorageError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn write_version_file(&self, version: &RuleVersion) -> Result<(), StorageError> {
        let dir = self.rule_dir(&version.rule_id);
        fs::create_dir_all(&dir)?;
        let path = self.version_path(&version.rule_id, version.version_number);
        fs::write(path, serde_json::to_string_pretty(version)?)?;
        Ok(())
    }

    /// All versions of one rule, unsorted. Missing directory means no
    /// versions yet.
    fn load_rule(&self, rule_id: &str) -> Result<Vec<RuleVersion>, StorageError> {
        let dir = self.rule_dir(rule_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                versions.push(Self::read_version_file(&path)?);
            }
        }
        Ok(versions)
    }

    fn rule_ids(&self) -> Result<Vec<String>, StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Locate a version by id across all rules.
    fn find_by_id(&self, id: &str) -> Result<RuleVersion, StorageError> {
        for rule_id in self.rule_ids()? {
            for version in self.load_rule(&rule_id)? {
                if version.id == id {
                    return Ok(version);
                }
            }
        }
        Err(StorageError::NotFound(format!("version '{}'", id)))
    }
}

impl VersionStore for FileVersionStore {
    fn create_version(
        &self,
        rule_id: &str,
        content: Map<String, Value>,
        meta: VersionMeta,
    ) -> Result<RuleVersion, StorageError> {
        let lock = self.rule_lock(rule_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let existing = self.load_rule(rule_id)?;
        let next = existing.iter().map(|v| v.version_number).max().unwrap_or(0) + 1;

        // Archive the outgoing active version before the new one
        // lands, so a reader never sees two actives.
        for mut version in existing {
            if version.status == VersionStatus::Active {
                version.status = VersionStatus::Archived;
                self.write_version_file(&version)?;
            }
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
        self.write_version_file(&version)?;
        Ok(version)
    }

    fn list_versions(
        &self,
        rule_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RuleVersion>, StorageError> {
        let mut versions = self.load_rule(rule_id)?;
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        if let Some(limit) = limit {
            versions.truncate(limit);
        }
        Ok(versions)
    }

    fn list_all_versions(&self, limit: Option<usize>) -> Result<Vec<RuleVersion>, StorageError> {
        let mut versions = Vec::new();
        for rule_id in self.rule_ids()? {
            versions.extend(self.load_rule(&rule_id)?);
        }
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            versions.truncate(limit);
        }
        Ok(versions)
    }

    fn get_version(&self, id: &str) -> Result<RuleVersion, StorageError> {
        self.find_by_id(id)
    }

    fn get_version_by_number(
        &self,
        rule_id: &str,
        version_number: u32,
    ) -> Result<RuleVersion, StorageError> {
        let path = self.version_path(rule_id, version_number);
        if !path.exists() {
            return Err(StorageError::NotFound(format!(
                "version {} of rule '{}'",
                version_number, rule_id
            )));
        }
        Self::read_version_file(&path)
    }

    fn get_active_version(&self, rule_id: &str) -> Result<Option<RuleVersion>, StorageError> {
        Ok(self
            .load_rule(rule_id)?
            .into_iter()
            .find(|v| v.status == VersionStatus::Active))
    }

    fn activate_version(&self, id: &str) -> Result<RuleVersion, StorageError> {
        let target = self.find_by_id(id)?;
        let lock = self.rule_lock(&target.rule_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut activated = None;
        for mut version in self.load_rule(&target.rule_id)? {
            let want = if version.id == id {
                VersionStatus::Active
            } else {
                VersionStatus::Archived
            };
            if version.status != want {
                version.status = want;
                self.write_version_file(&version)?;
            }
            if version.id == id {
                activated = Some(version);
            }
        }
        activated.ok_or_else(|| StorageError::NotFound(format!("version '{}'", id)))
    }

    fn delete_version(&self, id: &str) -> Result<(), StorageError> {
        let target = self.find_by_id(id)?;
        if target.status == VersionStatus::Active {
            return Err(StorageError::Validation(
                "cannot delete the active version".into(),
            ));
        }
        let lock = self.rule_lock(&target.rule_id);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::remove_file(self.version_path(&target.rule_id, target.version_number))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn content(key: &str) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert(key.to_string(), Value::Bool(true));
        m
    }

    #[test]
    fn directories_are_created_lazily() {
        let dir = TempDir::new().unwrap();
        let store = FileVersionStore::new(dir.path().join("versions"));
        assert!(store.list_versions("r1", None).unwrap().is_empty());
        store
            .create_version("r1", content("a"), VersionMeta::default())
            .unwrap();
        assert!(dir.path().join("versions/r1/1.json").exists());
    }

    #[test]
    fn persist_and_reload_round_trips() {
        let dir = TempDir::new().unwrap();
        let created = {
            let store = FileVersionStore::new(dir.path());
            store
                .create_version("r1", content("a"), VersionMeta::default())
                .unwrap()
        };
        // Fresh store over the same root sees the same record.
        let store = FileVersionStore::new(dir.path());
        let loaded = store.get_version_by_number("r1", 1).unwrap();
        assert_eq!(created, loaded);
    }

    #[test]
    fn second_create_archives_first_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = FileVersionStore::new(dir.path());
        store
            .create_version("r1", content("a"), VersionMeta::default())
            .unwrap();
        store
            .create_version("r1", content("b"), VersionMeta::default())
            .unwrap();
        let v1 = store.get_version_by_number("r1", 1).unwrap();
        assert_eq!(v1.status, VersionStatus::Archived);
        let active = store.get_active_version("r1").unwrap().unwrap();
        assert_eq!(active.version_number, 2);
    }
}
