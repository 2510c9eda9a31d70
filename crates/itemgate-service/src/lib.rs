//! The save-once coordinator: one `save_item` entry point over a pluggable
//! duplicate guard (in-process or shared) and an item backend.

mod config;
mod service;

pub use config::{Config, LockBackend};
pub use service::ItemService;
