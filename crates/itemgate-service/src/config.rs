use std::time::Duration;

use clap::Parser;

/// Configuration for the itemgate service.
#[derive(Parser, Debug, Clone)]
#[command(name = "itemgate")]
#[command(about = "Save-once item integration over an in-process or shared duplicate guard")]
pub struct Config {
    /// Duplicate guard backend: memory or redis
    #[arg(long, default_value = "memory", env = "LOCK_BACKEND")]
    pub lock_backend: LockBackend,

    /// Redis connection URL (only used with --lock-backend redis)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Lock time-to-live in seconds; expiry frees locks whose holder crashed
    #[arg(long, default_value = "120", env = "LOCK_TTL_SECS")]
    pub lock_ttl_secs: u64,

    /// Item contents to save; all saves are issued concurrently
    pub items: Vec<String>,
}

impl Config {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    /// Get the effective Redis URL.
    pub fn effective_redis_url(&self) -> String {
        self.redis_url
            .clone()
            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LockBackend {
    Memory,
    #[cfg(feature = "redis")]
    Redis,
}

impl std::fmt::Display for LockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockBackend::Memory => write!(f, "memory"),
            #[cfg(feature = "redis")]
            LockBackend::Redis => write!(f, "redis"),
        }
    }
}
