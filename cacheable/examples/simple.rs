//! Simple Cache-Aside Example
//!
//! Runs the same workflow against both stores:
//! 1. Load a user through the cache (miss, loader runs)
//! 2. Read it again (hit, loader skipped)
//! 3. Invalidate by a tag computed from the loaded value
//! 4. Read once more (miss, fresh load)
//!
//! Set `RUST_LOG=cacheable=debug` to see the coordinator's events.

use std::sync::Arc;
use std::time::Duration;

use cacheable::{typed, CacheConfig, CacheError, CacheManager, CacheOptions, CacheStore, Cached};
use cacheable::{LmdbStore, MemoryStore};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    team_ids: Vec<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== cacheable simple example ===\n");

    let config = CacheConfig::default().with_default_expiration(Duration::from_secs(60));

    let memory = CacheManager::new(Arc::new(MemoryStore::new()), config.clone())?;
    run("memory", &memory).await?;

    let dir = tempfile::tempdir()?;
    let lmdb = CacheManager::new(Arc::new(LmdbStore::new(dir.path(), 16)?), config)?;
    run("lmdb", &lmdb).await?;

    Ok(())
}

async fn run<S: CacheStore + ?Sized>(
    label: &str,
    manager: &CacheManager<S>,
) -> Result<(), CacheError> {
    println!("--- {label} store ---");

    let first = load_user(manager, "Alice").await?;
    report("first read", &first);

    let second = load_user(manager, "Bob").await?;
    report("second read", &second);

    let removed = manager.delete_by_tags(["teamId:7"]).await?;
    println!("  invalidated teamId:7: {removed} removed");

    let third = load_user(manager, "Carol").await?;
    report("third read", &third);

    manager.delete("users", "1").await?;
    println!("  deleted users/1\n");
    Ok(())
}

/// Read user 1, loading it under `name` on a miss.
async fn load_user<S: CacheStore + ?Sized>(
    manager: &CacheManager<S>,
    name: &str,
) -> Result<Cached<User>, CacheError> {
    let user = User {
        id: 1,
        name: name.to_string(),
        team_ids: vec![7, 8],
    };
    let team_tags = user
        .team_ids
        .iter()
        .map(|id| format!("teamId:{id}"))
        .collect::<Vec<_>>();

    typed::get(
        manager,
        "users",
        "1",
        move || async move { Ok::<_, CacheError>(user) },
        CacheOptions::new()
            .with_tags(["user"])
            .with_dynamic_tags(move || team_tags),
    )
    .await
}

fn report(step: &str, read: &Cached<User>) {
    let source = if read.cached { "cache" } else { "loader" };
    println!("  {step}: {} (from {source})", read.value.name);
}
