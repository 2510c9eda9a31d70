use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Script};
use tracing::{debug, instrument};

use itemgate_core::{LockStore, StoreError};

/// Compare-and-delete: delete the key only while it still carries our token.
/// Runs server-side so the read and the delete cannot interleave with
/// another client's SET.
const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Redis-backed lock store.
///
/// `set_if_not_exists` maps to `SET key value NX PX ttl`; expiry is enforced
/// by the server, so a crashed holder's lock disappears on its own. Uses a
/// multiplexed connection per operation for efficient connection reuse.
pub struct RedisLockStore {
    client: Client,
    release_script: Script,
}

impl RedisLockStore {
    /// Create a lock store from a connection URL
    /// (e.g., "redis://localhost:6379").
    pub fn new(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)
            .map_err(|e| StoreError::LockStore(format!("failed to create client: {e}")))?;
        Ok(Self {
            client,
            release_script: Script::new(RELEASE_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::LockStore(format!("failed to connect: {e}")))
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    #[instrument(skip(self, value), level = "debug")]
    async fn set_if_not_exists(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;

        // SET ... NX replies OK when the key was set, nil when it existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::LockStore(format!("SET NX failed: {e}")))?;

        let set = reply.is_some();
        debug!("SET NX on {}: {}", key, if set { "acquired" } else { "held" });
        Ok(set)
    }

    #[instrument(skip(self, expected), level = "debug")]
    async fn delete_if_matches(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;

        let deleted: i64 = self
            .release_script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::LockStore(format!("conditional DEL failed: {e}")))?;

        debug!("conditional DEL on {}: {}", key, deleted);
        Ok(deleted > 0)
    }
}

impl std::fmt::Debug for RedisLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLockStore").finish_non_exhaustive()
    }
}
