//! Audit payload construction, the deterministic decision hash, and
//! the audit sink contract.
//!
//! The hash input is the subset `{context, evaluations, decision,
//! confidence, scoring_strategy}`, serialized with RFC 8785
//! canonicalization and hashed with SHA-256. A process-wide bounded
//! cache maps a fast fingerprint of the canonical form to the digest;
//! the cache changes throughput, never output.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{OnceLock, RwLock};

use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::canonical::{canonicalize, sha256_hex};
use crate::context::Context;
use crate::types::{Decision, EngineError, Evaluation};

// ──────────────────────────────────────────────
// Audit sink
// ──────────────────────────────────────────────

/// Receives every finished decision together with its context. The
/// sink must not mutate either; both are handed out by shared
/// reference and are immutable values.
pub trait AuditSink: Send + Sync {
    fn record(&self, decision: &Decision, context: &Context) -> Result<(), EngineError>;
}

/// Discards every record. The default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _decision: &Decision, _context: &Context) -> Result<(), EngineError> {
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Hash cache
// ──────────────────────────────────────────────

const DEFAULT_CAPACITY: usize = 1000;

/// FNV-1a 64 over the canonical JSON, used as the cache key.
fn fingerprint(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

struct CacheEntry {
    canonical: String,
    digest: String,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<u64, CacheEntry>,
    /// Insertion order, oldest first, for eviction.
    order: VecDeque<u64>,
}

/// Bounded fingerprint-to-digest map. Lookups share a read lock and
/// tolerate missing entries; inserts take the write lock, re-check,
/// and evict the oldest tenth when full. The stored canonical string
/// is compared on hit, so a fingerprint collision degrades to a
/// recompute rather than a wrong digest.
pub struct HashCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

impl Default for HashCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl HashCache {
    pub fn with_capacity(capacity: usize) -> Self {
        HashCache {
            capacity: capacity.max(1),
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// The process-wide cache instance.
    pub fn global() -> &'static HashCache {
        static GLOBAL: OnceLock<HashCache> = OnceLock::new();
        GLOBAL.get_or_init(HashCache::default)
    }

    /// SHA-256 of the canonical text, from cache when possible.
    pub fn digest(&self, canonical: &str) -> String {
        let key = fingerprint(canonical);
        {
            let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = inner.entries.get(&key) {
                if entry.canonical == canonical {
                    return entry.digest.clone();
                }
            }
        }

        let digest = sha256_hex(canonical.as_bytes());

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        // Re-check after taking the write lock; another thread may
        // have filled the slot.
        if !inner.entries.contains_key(&key) {
            if inner.entries.len() >= self.capacity {
                let evict = (self.capacity / 10).max(1);
                for _ in 0..evict {
                    if let Some(old) = inner.order.pop_front() {
                        inner.entries.remove(&old);
                    }
                }
            }
            inner.entries.insert(
                key,
                CacheEntry {
                    canonical: canonical.to_string(),
                    digest: digest.clone(),
                },
            );
            inner.order.push_back(key);
        }
        digest
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }
}

// ──────────────────────────────────────────────
// Payload construction
// ──────────────────────────────────────────────

/// Build the audit payload: the hashed subset plus the digest itself
/// and a creation timestamp.
pub fn build_audit_payload(
    context: &Context,
    evaluations: &[Evaluation],
    decision: &str,
    confidence: f64,
    scoring_strategy: &str,
    cache: &HashCache,
) -> Result<Map<String, Value>, EngineError> {
    let mut payload = Map::new();
    payload.insert(
        "context".to_string(),
        Value::Object(context.as_map().clone()),
    );
    payload.insert(
        "evaluations".to_string(),
        serde_json::to_value(evaluations)
            .map_err(|e| EngineError::Eval(format!("evaluations are not serializable: {}", e)))?,
    );
    payload.insert("decision".to_string(), Value::String(decision.to_string()));
    payload.insert(
        "confidence".to_string(),
        serde_json::Number::from_f64(confidence)
            .map(Value::Number)
            .ok_or_else(|| EngineError::Eval(format!("confidence {} is not finite", confidence)))?,
    );
    payload.insert(
        "scoring_strategy".to_string(),
        Value::String(scoring_strategy.to_string()),
    );

    let canonical = canonicalize(&Value::Object(payload.clone()));
    let digest = cache.digest(&canonical);
    payload.insert("audit_hash".to_string(), Value::String(digest));
    let created_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| EngineError::Eval(format!("timestamp formatting failed: {}", e)))?;
    payload.insert("created_at".to_string(), Value::String(created_at));
    Ok(payload)
}
