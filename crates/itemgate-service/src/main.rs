use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use itemgate_core::DuplicateGuard;
use itemgate_local::{MemoryBackend, MemoryGuard};
use itemgate_service::{Config, ItemService, LockBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting itemgate");
    info!("  Lock backend: {}", config.lock_backend);
    info!("  Lock TTL: {}s", config.lock_ttl_secs);

    let guard = duplicate_guard(&config)?;
    let backend = Arc::new(MemoryBackend::new());
    let service = Arc::new(ItemService::new(backend, guard));

    // Issue every save concurrently; the guard is what keeps equal contents
    // from landing twice.
    let mut tasks = Vec::with_capacity(config.items.len());
    for content in config.items.clone() {
        let service = Arc::clone(&service);
        tasks.push(tokio::spawn(async move {
            let outcome = service.save_item(&content).await;
            (content, outcome)
        }));
    }

    for task in tasks {
        let (content, outcome) = task.await?;
        if outcome.succeeded {
            info!("{:?}: {}", content, outcome.message);
        } else {
            warn!("{:?}: {}", content, outcome.message);
        }
    }

    let items = service.get_all_items().await?;
    info!("{} item(s) stored", items.len());
    Ok(())
}

fn duplicate_guard(config: &Config) -> anyhow::Result<Arc<dyn DuplicateGuard>> {
    match config.lock_backend {
        LockBackend::Memory => Ok(Arc::new(MemoryGuard::with_ttl(config.lock_ttl()))),
        #[cfg(feature = "redis")]
        LockBackend::Redis => {
            let url = config.effective_redis_url();
            info!("  Redis URL: {}", url);
            let store = Arc::new(itemgate_redis::RedisLockStore::new(&url)?);
            Ok(Arc::new(itemgate_redis::SharedGuard::with_ttl(
                store,
                config.lock_ttl(),
            )))
        }
    }
}
