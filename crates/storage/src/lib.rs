//! arbiter-storage: rule version history, A/B testing, and the
//! storage adapter contracts.
//!
//! The version store keeps an append-only history per rule with an
//! exactly-one-active invariant; the A/B test manager layers a test
//! lifecycle and consistent variant assignment on top of it. Two
//! adapters ship in-tree: an in-memory store for tests and embedding,
//! and a file-backed store with one JSON document per version.

mod error;
mod file;
mod memory;
mod record;
mod traits;

pub mod abtest;
pub mod versions;

pub use abtest::{variant_bucket, ABTestManager, NewTest};
pub use error::StorageError;
pub use file::FileVersionStore;
pub use memory::{MemoryAssignmentStore, MemoryVersionStore};
pub use record::{
    ABTest, ABTestAssignment, RuleVersion, TestResults, TestStatus, TrafficSplit, Variant,
    VariantResults, VersionMeta, VersionStatus,
};
pub use traits::{AssignmentStore, VersionStore};
pub use versions::{VersionDiff, VersionHistory, VersionManager};
