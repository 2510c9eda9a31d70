use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use itemgate_core::{Item, ItemBackend, StoreError};

/// In-memory item backend with sequential id assignment.
///
/// Performs no deduplication of its own; it will happily store two items
/// with the same content if asked to. `with_write_delay` injects latency
/// into `save_item` to widen race windows in concurrency tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<Vec<Item>>,
    next_id: AtomicU64,
    write_delay: Option<Duration>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every `save_item` before the write lands.
    pub fn with_write_delay(delay: Duration) -> Self {
        Self {
            write_delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ItemBackend for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn find_items_with_content(&self, content: &str) -> Result<Vec<Item>, StoreError> {
        let items = self
            .items
            .lock()
            .map_err(|_| StoreError::Internal("item store poisoned".to_string()))?;
        Ok(items.iter().filter(|i| i.content == content).cloned().collect())
    }

    #[instrument(skip(self, content), level = "debug")]
    async fn save_item(&self, content: &str) -> Result<Item, StoreError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let item = Item {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        };

        let mut items = self
            .items
            .lock()
            .map_err(|_| StoreError::Internal("item store poisoned".to_string()))?;
        items.push(item.clone());
        debug!("saved item {} ({} bytes)", item.id, content.len());
        Ok(item)
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_all_items(&self) -> Result<Vec<Item>, StoreError> {
        let items = self
            .items
            .lock()
            .map_err(|_| StoreError::Internal("item store poisoned".to_string()))?;
        Ok(items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_are_sequential_and_unique() {
        let backend = MemoryBackend::new();

        let first = backend.save_item("a").await.unwrap();
        let second = backend.save_item("b").await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn find_matches_exact_content_only() {
        let backend = MemoryBackend::new();
        backend.save_item("alpha").await.unwrap();
        backend.save_item("beta").await.unwrap();

        let found = backend.find_items_with_content("alpha").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "alpha");
        assert!(backend.find_items_with_content("gamma").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_all_returns_everything() {
        let backend = MemoryBackend::new();
        backend.save_item("a").await.unwrap();
        backend.save_item("b").await.unwrap();

        let all = backend.get_all_items().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn backend_alone_does_not_deduplicate() {
        // Save-once is the coordinator's contract, not the backend's.
        let backend = MemoryBackend::new();
        backend.save_item("same").await.unwrap();
        backend.save_item("same").await.unwrap();

        assert_eq!(backend.find_items_with_content("same").await.unwrap().len(), 2);
    }
}
