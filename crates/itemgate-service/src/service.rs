use std::sync::Arc;

use tracing::{debug, instrument, warn};

use itemgate_core::{DuplicateGuard, Item, ItemBackend, SaveOutcome, StoreError};

/// The save-once coordinator.
///
/// Orchestrates check, acquire, persist, release for each save attempt and
/// folds every failure mode into the returned `SaveOutcome`; no error
/// crosses this boundary. Saves of distinct content run fully in parallel —
/// the guard keys exclusion by content, nothing here serializes globally.
pub struct ItemService {
    backend: Arc<dyn ItemBackend>,
    guard: Arc<dyn DuplicateGuard>,
}

impl ItemService {
    pub fn new(backend: Arc<dyn ItemBackend>, guard: Arc<dyn DuplicateGuard>) -> Self {
        Self { backend, guard }
    }

    /// Save `content` unless an equal item already exists or is being saved.
    ///
    /// Duplicate rejections are terminal for this call; retrying is the
    /// caller's decision, never done here.
    #[instrument(skip(self, content), level = "debug")]
    pub async fn save_item(&self, content: &str) -> SaveOutcome {
        // Fast path: skip lock traffic when the item is already durable.
        // This read is unsynchronized; the guard acquisition below is what
        // makes the dedup race-free.
        match self.backend.find_items_with_content(content).await {
            Ok(existing) if !existing.is_empty() => return SaveOutcome::duplicate_persisted(),
            Ok(_) => {}
            Err(e) => return SaveOutcome::persistence_failed(&e),
        }

        let handle = match self.guard.acquire(content).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return SaveOutcome::duplicate_in_flight(),
            Err(e) => return SaveOutcome::lock_unavailable(&e),
        };

        let outcome = self.persist_locked(content).await;

        // Single release point for every path out of the locked section,
        // persistence failure included. Release trouble is logged, not
        // surfaced: the outcome already carries the caller's answer.
        if let Err(e) = self.guard.release(&handle).await {
            warn!("failed to release lock on {}: {}", handle.key, e);
        }

        outcome
    }

    /// Runs while the lock is held: confirm absence, then persist.
    async fn persist_locked(&self, content: &str) -> SaveOutcome {
        // Re-check under the lock: another caller may have saved and
        // released between our fast-path read and our acquisition.
        match self.backend.find_items_with_content(content).await {
            Ok(existing) if !existing.is_empty() => return SaveOutcome::duplicate_persisted(),
            Ok(_) => {}
            Err(e) => return SaveOutcome::persistence_failed(&e),
        }

        match self.backend.save_item(content).await {
            Ok(item) => {
                debug!("item {} persisted via {}", item.id, self.backend.backend_name());
                SaveOutcome::saved(&item)
            }
            Err(e) => SaveOutcome::persistence_failed(&e),
        }
    }

    /// Enumerate every saved item. Read-only, no locking involved.
    pub async fn get_all_items(&self) -> Result<Vec<Item>, StoreError> {
        self.backend.get_all_items().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::future::join_all;

    use itemgate_core::{LockHandle, SaveStatus};
    use itemgate_local::{MemoryBackend, MemoryGuard};

    use super::*;

    fn service(backend: Arc<dyn ItemBackend>) -> ItemService {
        ItemService::new(backend, Arc::new(MemoryGuard::new()))
    }

    #[tokio::test]
    async fn sequential_resave_is_rejected() {
        let svc = service(Arc::new(MemoryBackend::new()));

        let first = svc.save_item("A").await;
        assert!(first.succeeded);
        assert_eq!(first.status, SaveStatus::Saved);
        assert!(first.message.contains("saved with id"));

        let second = svc.save_item("A").await;
        assert!(!second.succeeded);
        assert_eq!(second.status, SaveStatus::DuplicatePersisted);
    }

    #[tokio::test]
    async fn concurrent_same_content_has_one_winner() {
        // Slow writes widen the race window between the existence check and
        // the acquisition.
        let backend = Arc::new(MemoryBackend::with_write_delay(Duration::from_millis(50)));
        let dyn_backend: Arc<dyn ItemBackend> = backend.clone();
        let svc = Arc::new(service(dyn_backend));
        let barrier = Arc::new(tokio::sync::Barrier::new(8));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let svc = Arc::clone(&svc);
            let barrier = Arc::clone(&barrier);
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                svc.save_item("B").await
            }));
        }

        let outcomes: Vec<SaveOutcome> =
            join_all(tasks).await.into_iter().map(|t| t.unwrap()).collect();

        let winners = outcomes.iter().filter(|o| o.succeeded).count();
        assert_eq!(winners, 1);
        assert!(outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .all(|o| matches!(
                o.status,
                SaveStatus::DuplicateInFlight | SaveStatus::DuplicatePersisted
            )));

        // The backend holds exactly one copy.
        assert_eq!(backend.find_items_with_content("B").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_distinct_contents_both_succeed() {
        let svc = Arc::new(service(Arc::new(MemoryBackend::with_write_delay(
            Duration::from_millis(50),
        ))));

        let (c, d) = tokio::join!(svc.save_item("C"), svc.save_item("D"));
        assert!(c.succeeded);
        assert!(d.succeeded);
        assert_ne!(c.message, d.message);

        assert_eq!(svc.get_all_items().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn save_rejected_while_lock_is_held() {
        let guard = Arc::new(MemoryGuard::new());
        let dyn_guard: Arc<dyn DuplicateGuard> = guard.clone();
        let svc = ItemService::new(Arc::new(MemoryBackend::new()), dyn_guard);

        let handle = guard.acquire("E").await.unwrap().unwrap();
        let outcome = svc.save_item("E").await;
        assert_eq!(outcome.status, SaveStatus::DuplicateInFlight);

        guard.release(&handle).await.unwrap();
        assert!(svc.save_item("E").await.succeeded);
    }

    /// Backend that fails a fixed number of saves before behaving normally.
    struct FlakyBackend {
        inner: MemoryBackend,
        failures_remaining: AtomicU32,
    }

    impl FlakyBackend {
        fn failing_once() -> Self {
            Self {
                inner: MemoryBackend::new(),
                failures_remaining: AtomicU32::new(1),
            }
        }
    }

    #[async_trait]
    impl ItemBackend for FlakyBackend {
        fn backend_name(&self) -> &'static str {
            "flaky"
        }

        async fn find_items_with_content(&self, content: &str) -> Result<Vec<Item>, StoreError> {
            self.inner.find_items_with_content(content).await
        }

        async fn save_item(&self, content: &str) -> Result<Item, StoreError> {
            if self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.save_item(content).await
        }

        async fn get_all_items(&self) -> Result<Vec<Item>, StoreError> {
            self.inner.get_all_items().await
        }
    }

    #[tokio::test]
    async fn backend_failure_does_not_leak_the_lock() {
        let svc = service(Arc::new(FlakyBackend::failing_once()));

        let failed = svc.save_item("F").await;
        assert!(!failed.succeeded);
        assert_eq!(failed.status, SaveStatus::PersistenceFailed);
        assert!(failed.message.contains("disk full"));

        // The failing call released its lock on the way out; a retry must
        // not be denied by a stale holder.
        let retried = svc.save_item("F").await;
        assert!(retried.succeeded, "retry was denied: {}", retried.message);
    }

    /// Guard whose lock store is unreachable.
    struct OfflineGuard;

    #[async_trait]
    impl DuplicateGuard for OfflineGuard {
        fn guard_name(&self) -> &'static str {
            "offline"
        }

        async fn acquire(&self, _content: &str) -> Result<Option<LockHandle>, StoreError> {
            Err(StoreError::LockStore("connection refused".to_string()))
        }

        async fn release(&self, _handle: &LockHandle) -> Result<(), StoreError> {
            Err(StoreError::LockStore("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn lock_outage_is_not_reported_as_contention() {
        let svc = ItemService::new(Arc::new(MemoryBackend::new()), Arc::new(OfflineGuard));

        let outcome = svc.save_item("G").await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.status, SaveStatus::LockUnavailable);
        assert_ne!(outcome.message, SaveOutcome::duplicate_in_flight().message);
    }

    #[tokio::test]
    async fn expired_lock_does_not_block_future_saves() {
        let guard = Arc::new(MemoryGuard::with_ttl(Duration::from_millis(10)));
        let dyn_guard: Arc<dyn DuplicateGuard> = guard.clone();
        let svc = ItemService::new(Arc::new(MemoryBackend::new()), dyn_guard);

        // A holder that never releases: acquire directly and drop the handle.
        let _abandoned = guard.acquire("H").await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(svc.save_item("H").await.succeeded);
    }

    #[tokio::test]
    async fn get_all_items_passes_through() {
        let svc = service(Arc::new(MemoryBackend::new()));
        svc.save_item("one").await;
        svc.save_item("two").await;

        let items = svc.get_all_items().await.unwrap();
        assert_eq!(items.len(), 2);
        let mut contents: Vec<_> = items.iter().map(|i| i.content.as_str()).collect();
        contents.sort_unstable();
        assert_eq!(contents, ["one", "two"]);
    }
}
