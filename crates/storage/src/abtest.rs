//! A/B test lifecycle, consistent variant assignment, and result
//! aggregation.
//!
//! Variant assignment hashes `"<test_id>:<user_id>"` with SHA-256 and
//! reduces the digest modulo 100, so the same user lands in the same
//! variant for the lifetime of a test without coordination. Anonymous
//! assignments draw a uniform bucket instead.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rand::Rng;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StorageError;
use crate::record::{ABTest, ABTestAssignment, TestResults, TestStatus, TrafficSplit, Variant};
use crate::traits::{AssignmentStore, VersionStore};

/// Parameters for creating a test. The id is generated when absent.
#[derive(Debug, Clone)]
pub struct NewTest {
    pub id: Option<String>,
    pub name: String,
    pub champion_version_id: String,
    pub challenger_version_id: String,
    pub traffic_split: TrafficSplit,
    pub start_date: OffsetDateTime,
    pub end_date: Option<OffsetDateTime>,
}

/// Reduce the SHA-256 of `"<test_id>:<user_id>"`, read as a big-endian
/// integer, modulo 100.
pub fn variant_bucket(test_id: &str, user_id: &str) -> u8 {
    let digest = Sha256::digest(format!("{}:{}", test_id, user_id).as_bytes());
    // Horner's rule keeps the big-endian value mod 100 without bignums.
    let mut acc: u32 = 0;
    for byte in digest {
        acc = (acc * 256 + u32::from(byte)) % 100;
    }
    acc as u8
}

pub struct ABTestManager {
    versions: Arc<dyn VersionStore>,
    assignments: Arc<dyn AssignmentStore>,
    tests: Mutex<BTreeMap<String, ABTest>>,
}

impl ABTestManager {
    pub fn new(versions: Arc<dyn VersionStore>, assignments: Arc<dyn AssignmentStore>) -> Self {
        ABTestManager {
            versions,
            assignments,
            tests: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock_tests(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ABTest>> {
        self.tests.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Register a test in `scheduled` state. Both referenced versions
    /// must exist.
    pub fn create_test(&self, new: NewTest) -> Result<ABTest, StorageError> {
        let test = ABTest {
            id: new.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: new.name,
            champion_version_id: new.champion_version_id,
            challenger_version_id: new.challenger_version_id,
            traffic_split: new.traffic_split,
            start_date: new.start_date,
            end_date: new.end_date,
            status: TestStatus::Scheduled,
        };
        test.validate()?;
        self.versions.get_version(&test.champion_version_id)?;
        self.versions.get_version(&test.challenger_version_id)?;

        let mut tests = self.lock_tests();
        if tests.contains_key(&test.id) {
            return Err(StorageError::Validation(format!(
                "test '{}' already exists",
                test.id
            )));
        }
        tests.insert(test.id.clone(), test.clone());
        Ok(test)
    }

    pub fn get_test(&self, test_id: &str) -> Result<ABTest, StorageError> {
        let mut tests = self.lock_tests();
        let test = tests
            .get_mut(test_id)
            .ok_or_else(|| StorageError::NotFound(format!("ab test '{}'", test_id)))?;
        Self::auto_complete(test, OffsetDateTime::now_utc());
        Ok(test.clone())
    }

    pub fn list_tests(&self) -> Vec<ABTest> {
        self.lock_tests().values().cloned().collect()
    }

    pub fn start(&self, test_id: &str) -> Result<ABTest, StorageError> {
        self.transition(test_id, TestStatus::Running, &[TestStatus::Scheduled])
    }

    pub fn complete(&self, test_id: &str) -> Result<ABTest, StorageError> {
        self.transition(test_id, TestStatus::Completed, &[TestStatus::Running])
    }

    /// Cancellation is permitted while a test is scheduled or running;
    /// a completed test stays completed.
    pub fn cancel(&self, test_id: &str) -> Result<ABTest, StorageError> {
        self.transition(
            test_id,
            TestStatus::Cancelled,
            &[TestStatus::Scheduled, TestStatus::Running],
        )
    }

    fn transition(
        &self,
        test_id: &str,
        to: TestStatus,
        allowed_from: &[TestStatus],
    ) -> Result<ABTest, StorageError> {
        let mut tests = self.lock_tests();
        let test = tests
            .get_mut(test_id)
            .ok_or_else(|| StorageError::NotFound(format!("ab test '{}'", test_id)))?;
        Self::auto_complete(test, OffsetDateTime::now_utc());
        if !allowed_from.contains(&test.status) {
            return Err(StorageError::InvalidStatusTransition {
                from: test.status,
                to,
            });
        }
        test.status = to;
        Ok(test.clone())
    }

    /// A running test whose end date has passed completes on the next
    /// observation.
    fn auto_complete(test: &mut ABTest, now: OffsetDateTime) {
        if test.status == TestStatus::Running {
            if let Some(end) = test.end_date {
                if now > end {
                    test.status = TestStatus::Completed;
                }
            }
        }
    }

    // ── Assignment ──────────────────────────────────────────────

    /// Assign a variant and persist the assignment. With a `user_id`
    /// the bucket is the consistent hash, and an existing assignment
    /// for the same user is returned as-is; anonymous callers draw a
    /// fresh uniform bucket each time.
    pub fn assign(
        &self,
        test_id: &str,
        user_id: Option<&str>,
        context: Map<String, Value>,
    ) -> Result<ABTestAssignment, StorageError> {
        let now = OffsetDateTime::now_utc();
        let test = {
            let mut tests = self.lock_tests();
            let test = tests
                .get_mut(test_id)
                .ok_or_else(|| StorageError::NotFound(format!("ab test '{}'", test_id)))?;
            Self::auto_complete(test, now);
            if !test.effectively_running(now) {
                return Err(StorageError::TestNotRunning {
                    test_id: test_id.to_string(),
                });
            }
            test.clone()
        };

        if let Some(user) = user_id {
            if let Some(existing) = self.assignments.find_by_user(test_id, user)? {
                return Ok(existing);
            }
        }

        let bucket: u8 = match user_id {
            Some(user) => variant_bucket(test_id, user),
            None => rand::thread_rng().gen_range(0..100u8),
        };
        let variant = if bucket < test.traffic_split.champion {
            Variant::Champion
        } else {
            Variant::Challenger
        };

        let assignment = ABTestAssignment {
            id: Uuid::new_v4().to_string(),
            ab_test_id: test_id.to_string(),
            user_id: user_id.map(str::to_owned),
            variant,
            version_id: test.version_for(variant).to_string(),
            timestamp: now,
            decision_result: None,
            confidence: None,
            context,
        };
        self.assignments.insert(assignment.clone())?;
        Ok(assignment)
    }

    /// Attach a decision outcome to an assignment.
    pub fn record_decision(
        &self,
        assignment_id: &str,
        decision: &str,
        confidence: f64,
    ) -> Result<ABTestAssignment, StorageError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(StorageError::Validation(format!(
                "confidence must be within [0, 1], got {}",
                confidence
            )));
        }
        let mut assignment = self.assignments.get(assignment_id)?;
        assignment.decision_result = Some(decision.to_string());
        assignment.confidence = Some(confidence);
        self.assignments.update(&assignment)?;
        Ok(assignment)
    }

    // ── Results ─────────────────────────────────────────────────

    /// Counts per variant, per-decision tallies, and average recorded
    /// confidence per variant.
    pub fn get_results(&self, test_id: &str) -> Result<TestResults, StorageError> {
        // Unknown tests surface NotFound rather than empty results.
        self.get_test(test_id)?;
        let mut results = TestResults::default();
        let mut confidence_sums = [(0.0f64, 0u64); 2];
        for assignment in self.assignments.list_for_test(test_id)? {
            let idx = match assignment.variant {
                Variant::Champion => 0,
                Variant::Challenger => 1,
            };
            let slot = match assignment.variant {
                Variant::Champion => &mut results.champion,
                Variant::Challenger => &mut results.challenger,
            };
            slot.assignments += 1;
            if let Some(decision) = &assignment.decision_result {
                *slot.decisions.entry(decision.clone()).or_insert(0) += 1;
            }
            if let Some(confidence) = assignment.confidence {
                confidence_sums[idx].0 += confidence;
                confidence_sums[idx].1 += 1;
            }
        }
        for (idx, slot) in [&mut results.champion, &mut results.challenger]
            .into_iter()
            .enumerate()
        {
            let (sum, count) = confidence_sums[idx];
            if count > 0 {
                slot.avg_confidence = Some(sum / count as f64);
            }
        }
        Ok(results)
    }
}
