//! Core traits and types for the itemgate save-once integration.
//!
//! This crate defines the abstractions shared between the in-process and
//! shared-store implementations:
//! - `ItemBackend`: durable item persistence (find, save, enumerate)
//! - `DuplicateGuard`: mutual exclusion keyed by item content
//! - `LockStore`: the atomic primitives a shared lock store must offer
//! - `Item` / `SaveOutcome`: the values reported to callers

mod backend;
mod error;
mod item;
mod lock;

pub use backend::ItemBackend;
pub use error::StoreError;
pub use item::{Item, SaveOutcome, SaveStatus};
pub use lock::{content_key, DuplicateGuard, LockHandle, LockStore, DEFAULT_LOCK_TTL};
