use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};
use uuid::Uuid;

use itemgate_core::{
    content_key, DuplicateGuard, LockHandle, LockStore, StoreError, DEFAULT_LOCK_TTL,
};

/// Duplicate guard over a shared lock store.
///
/// Acquisition is a single conditional set carrying a fresh token and the
/// TTL; the store's atomicity is what makes concurrent callers on the same
/// content produce exactly one winner across all cooperating processes.
/// Release is a conditional delete keyed on the token, so a release that
/// arrives after expiry and re-acquisition leaves the new holder alone.
pub struct SharedGuard {
    store: Arc<dyn LockStore>,
    ttl: Duration,
}

impl SharedGuard {
    /// Create a guard with the default 120 s lock TTL.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self::with_ttl(store, DEFAULT_LOCK_TTL)
    }

    /// Create a guard with a custom lock TTL.
    pub fn with_ttl(store: Arc<dyn LockStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn lock_key(content: &str) -> String {
        format!("itemgate:lock:{}", content_key(content))
    }
}

#[async_trait]
impl DuplicateGuard for SharedGuard {
    fn guard_name(&self) -> &'static str {
        "shared"
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn acquire(&self, content: &str) -> Result<Option<LockHandle>, StoreError> {
        let key = Self::lock_key(content);
        let token = Uuid::new_v4().to_string();
        let expires_at_ms = chrono::Utc::now().timestamp_millis() + self.ttl.as_millis() as i64;

        if !self.store.set_if_not_exists(&key, &token, self.ttl).await? {
            debug!("lock on {} denied: held elsewhere", key);
            return Ok(None);
        }

        debug!("acquired lock on {} (expires at {})", key, expires_at_ms);
        Ok(Some(LockHandle {
            key,
            token,
            expires_at_ms,
        }))
    }

    #[instrument(skip(self, handle), level = "debug")]
    async fn release(&self, handle: &LockHandle) -> Result<(), StoreError> {
        let deleted = self
            .store
            .delete_if_matches(&handle.key, &handle.token)
            .await?;
        if deleted {
            debug!("released lock on {}", handle.key);
        } else {
            debug!("release of {} was a no-op", handle.key);
        }
        Ok(())
    }
}
