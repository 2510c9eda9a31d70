use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use itemgate_core::{content_key, DuplicateGuard, LockHandle, StoreError, DEFAULT_LOCK_TTL};

/// A lock currently held in the processing registry.
#[derive(Debug, Clone)]
struct HeldLock {
    token: String,
    expires_at_ms: i64,
}

/// In-process duplicate guard.
///
/// The registry maps content keys to held locks; acquisition is an atomic
/// insert-if-absent through the map's entry API, so concurrent callers on
/// the same key see exactly one winner. Entries for distinct keys live in
/// independent shards and never contend.
///
/// Within one process a holder cannot really crash without the entry being
/// droppable, but expiry is still modeled so behavior matches the shared
/// guard and stays testable.
#[derive(Debug)]
pub struct MemoryGuard {
    ttl: Duration,
    registry: DashMap<String, HeldLock>,
}

impl MemoryGuard {
    /// Create a guard with the default 120 s lock TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_LOCK_TTL)
    }

    /// Create a guard with a custom lock TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            registry: DashMap::new(),
        }
    }

    /// Number of locks currently registered (expired entries included until
    /// they are taken over or released).
    pub fn held_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for MemoryGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DuplicateGuard for MemoryGuard {
    fn guard_name(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn acquire(&self, content: &str) -> Result<Option<LockHandle>, StoreError> {
        let key = content_key(content);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let held = HeldLock {
            token: Uuid::new_v4().to_string(),
            expires_at_ms: now_ms + self.ttl.as_millis() as i64,
        };

        // The entry holds the shard lock across the check-and-insert, which
        // is what makes acquisition atomic per key.
        let handle = match self.registry.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                if slot.get().expires_at_ms > now_ms {
                    debug!("lock on {} denied: held until {}", key, slot.get().expires_at_ms);
                    return Ok(None);
                }
                // Previous holder never released and has expired; take over.
                slot.insert(held.clone());
                LockHandle {
                    key,
                    token: held.token,
                    expires_at_ms: held.expires_at_ms,
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(held.clone());
                LockHandle {
                    key,
                    token: held.token,
                    expires_at_ms: held.expires_at_ms,
                }
            }
        };

        debug!("acquired lock on {} (expires at {})", handle.key, handle.expires_at_ms);
        Ok(Some(handle))
    }

    #[instrument(skip(self, handle), level = "debug")]
    async fn release(&self, handle: &LockHandle) -> Result<(), StoreError> {
        // Compare-and-delete on the token: a stale release after expiry and
        // re-acquisition must not evict the new holder.
        let removed = self
            .registry
            .remove_if(&handle.key, |_, held| held.token == handle.token);

        match removed {
            Some(_) => debug!("released lock on {}", handle.key),
            None => debug!("release of {} was a no-op", handle.key),
        }
        Ok(())
    }
}
