//! Shared-store implementations of the itemgate abstractions:
//! - `SharedGuard`: duplicate guard over any `LockStore`
//! - `RedisLockStore`: `LockStore` over a Redis server

mod guard;
mod store;

pub use guard::SharedGuard;
pub use store::RedisLockStore;
