use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::error::StorageError;

// ──────────────────────────────────────────────
// Rule versions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Active,
    Archived,
}

/// An immutable snapshot of a rule's content.
///
/// For each `rule_id`, version numbers are a prefix of the positive
/// integers and exactly one version is `active` whenever any exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleVersion {
    pub id: String,
    pub rule_id: String,
    pub version_number: u32,
    pub content: Map<String, Value>,
    pub status: VersionStatus,
    /// RFC 3339 timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: Option<String>,
    pub changelog: String,
}

/// Optional metadata supplied when creating a version.
#[derive(Debug, Clone, Default)]
pub struct VersionMeta {
    pub created_by: Option<String>,
    pub changelog: Option<String>,
}

// ──────────────────────────────────────────────
// A/B tests
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Scheduled,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Champion,
    Challenger,
}

/// Percentage split between champion and challenger. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSplit {
    pub champion: u8,
    pub challenger: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ABTest {
    pub id: String,
    pub name: String,
    pub champion_version_id: String,
    pub challenger_version_id: String,
    pub traffic_split: TrafficSplit,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    pub status: TestStatus,
}

impl ABTest {
    /// Validate construction invariants. Runs before a test is
    /// accepted by the manager.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.name.trim().is_empty() {
            return Err(StorageError::Validation("test name must not be empty".into()));
        }
        if self.champion_version_id == self.challenger_version_id {
            return Err(StorageError::Validation(
                "champion and challenger must be different versions".into(),
            ));
        }
        let split = self.traffic_split;
        if u32::from(split.champion) + u32::from(split.challenger) != 100 {
            return Err(StorageError::Validation(format!(
                "traffic split must sum to 100, got {} + {}",
                split.champion, split.challenger
            )));
        }
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                return Err(StorageError::Validation(
                    "end_date must be after start_date".into(),
                ));
            }
        }
        Ok(())
    }

    /// A test accepts assignments iff it is running and `now` falls
    /// inside its date window.
    pub fn effectively_running(&self, now: OffsetDateTime) -> bool {
        self.status == TestStatus::Running
            && self.start_date <= now
            && self.end_date.map(|end| now <= end).unwrap_or(true)
    }

    /// Version id serving the given variant.
    pub fn version_for(&self, variant: Variant) -> &str {
        match variant {
            Variant::Champion => &self.champion_version_id,
            Variant::Challenger => &self.challenger_version_id,
        }
    }
}

// ──────────────────────────────────────────────
// Assignments
// ──────────────────────────────────────────────

/// A persisted variant assignment, later updated with the decision
/// outcome recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ABTestAssignment {
    pub id: String,
    pub ab_test_id: String,
    pub user_id: Option<String>,
    pub variant: Variant,
    pub version_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub decision_result: Option<String>,
    pub confidence: Option<f64>,
    pub context: Map<String, Value>,
}

// ──────────────────────────────────────────────
// Result aggregation
// ──────────────────────────────────────────────

/// Per-variant tallies for `get_results`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariantResults {
    pub assignments: u64,
    /// Count per recorded decision string.
    pub decisions: std::collections::BTreeMap<String, u64>,
    /// Mean confidence over assignments that recorded one.
    pub avg_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestResults {
    pub champion: VariantResults,
    pub challenger: VariantResults,
}
