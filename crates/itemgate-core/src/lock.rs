use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::StoreError;

/// How long an unreleased lock stays held before it expires on its own.
/// Expiry is a liveness safeguard against a holder that crashed mid-save;
/// it is not part of the normal release path.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(120);

/// Derive the lock key for an item content.
///
/// Hashing keeps keys bounded and store-safe regardless of content size or
/// characters; equal content always maps to the same key.
pub fn content_key(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Proof of exclusive ownership of a content key.
///
/// The token is unique per acquisition attempt; release matches on it so a
/// late release can never evict a lock someone else acquired after this one
/// expired.
#[derive(Debug, Clone)]
pub struct LockHandle {
    pub key: String,
    pub token: String,
    /// Absolute expiry, UTC milliseconds.
    pub expires_at_ms: i64,
}

/// Mutual exclusion keyed by item content.
///
/// Implementations must make `acquire` atomic: concurrent callers racing on
/// the same content produce exactly one `Some` and the rest `None`,
/// immediately — nobody waits for the lock to free. Distinct content keys
/// never contend with each other.
#[async_trait]
pub trait DuplicateGuard: Send + Sync {
    /// Returns the guard identifier (e.g., "memory", "shared").
    fn guard_name(&self) -> &'static str;

    /// Attempt to take the lock for `content`.
    ///
    /// `Ok(Some(handle))` on success, `Ok(None)` when another caller holds
    /// the lock. `Err` is reserved for lock-store infrastructure failures
    /// and must never be used to signal contention.
    async fn acquire(&self, content: &str) -> Result<Option<LockHandle>, StoreError>;

    /// Release a previously acquired handle.
    ///
    /// Idempotent: releasing an expired or already-released handle is a
    /// no-op. Only the holder identified by the handle's token is released.
    async fn release(&self, handle: &LockHandle) -> Result<(), StoreError>;
}

/// The atomic primitives a shared lock store must offer.
///
/// Both operations are conditional and must be atomic on the store side;
/// the guard layers no extra synchronization on top of them.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Set `key` to `value` with the given time-to-live, only if the key is
    /// absent. Returns whether the set happened.
    async fn set_if_not_exists(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Delete `key` only if its current value equals `expected`. Returns
    /// whether a delete happened. An unconditional delete here is a
    /// correctness bug: it would let a stale holder free a re-acquired lock.
    async fn delete_if_matches(&self, key: &str, expected: &str) -> Result<bool, StoreError>;
}
