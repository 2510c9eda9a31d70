use async_trait::async_trait;

use crate::error::StoreError;
use crate::item::Item;

/// Durable item persistence.
///
/// The backend assigns ids and is assumed internally safe for concurrent
/// reads and writes. It performs no deduplication of its own: enforcing
/// save-once is the coordinator's job, not the backend's.
#[async_trait]
pub trait ItemBackend: Send + Sync {
    /// Returns the backend identifier (e.g., "memory").
    fn backend_name(&self) -> &'static str;

    /// Find all items whose content equals `content`.
    async fn find_items_with_content(&self, content: &str) -> Result<Vec<Item>, StoreError>;

    /// Persist an item and assign it an id.
    async fn save_item(&self, content: &str) -> Result<Item, StoreError>;

    /// Enumerate every saved item.
    async fn get_all_items(&self) -> Result<Vec<Item>, StoreError>;
}
