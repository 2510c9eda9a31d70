//! Single-process implementations of the itemgate abstractions:
//! - `MemoryGuard`: duplicate guard over a process-local concurrent map
//! - `MemoryBackend`: in-memory item backend with sequential id assignment

mod backend;
mod guard;

pub use backend::MemoryBackend;
pub use guard::MemoryGuard;
