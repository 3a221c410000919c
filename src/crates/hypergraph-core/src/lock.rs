//! Per-approach exclusive lock (`§4.1`, `§5`): serializes mutators across
//! concurrent sessions/tasks in one process so two tool calls never race on
//! the same `hypergraph.json`. Keyed by canonicalized approach directory in
//! a process-wide `DashMap`, mirroring a connection-pool keying pattern of
//! one lock/handle per resource identity.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

static REGISTRY: OnceLock<DashMap<PathBuf, Arc<Mutex<()>>>> = OnceLock::new();

fn registry() -> &'static DashMap<PathBuf, Arc<Mutex<()>>> {
    REGISTRY.get_or_init(DashMap::new)
}

/// Acquire the exclusive lock for `approach_dir`, creating it on first use.
/// The returned guard serializes with every other lock acquired for the
/// same (canonicalized) path, in this process, regardless of which `Store`
/// instance requested it.
pub async fn acquire(approach_dir: &Path) -> tokio::sync::OwnedMutexGuard<()> {
    // Canonicalize before keying the registry so that a relative path, an
    // absolute path, a path with a trailing separator, and a symlink that
    // all name the same directory share one lock instead of silently
    // racing on separate ones. An approach directory that doesn't exist
    // yet (e.g. being created for the first time) can't be canonicalized;
    // fall back to the given path in that case, since `Store::save`
    // always creates the directory before the next `acquire` call for it.
    let key = approach_dir.canonicalize().unwrap_or_else(|_| approach_dir.to_path_buf());
    let lock = registry().entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}
