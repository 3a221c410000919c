//! File Watcher & Fan-out (`§4.9`): notifies subscribed UI clients whenever
//! `hypergraph.json` under an approach changes on disk, whether the change
//! came from this process's own [`hypergraph_core::Store::save`] or from an
//! external edit. Orchestrator chat events flow through the same
//! per-approach broadcast channel so a client sees one ordered stream
//! mixing graph updates and chat activity (`§4.9`, `§5` ordering
//! guarantees).

use crate::events::OrchestratorEvent;
use dashmap::DashMap;
use hypergraph_core::{ChangeNotification, Store};
use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, NoCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, warn};

/// Per-approach event fan-out. One [`broadcast::Sender`] per approach
/// directory, created lazily on first subscribe or first watch.
pub struct Fanout {
    channels: DashMap<PathBuf, broadcast::Sender<OrchestratorEvent>>,
}

impl Fanout {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { channels: DashMap::new() })
    }

    /// Get (creating if absent) the broadcast sender for `approach_dir`.
    pub fn channel(&self, approach_dir: &Path) -> broadcast::Sender<OrchestratorEvent> {
        self.channels
            .entry(approach_dir.to_path_buf())
            .or_insert_with(|| broadcast::channel(1024).0)
            .clone()
    }

    /// Subscribe to `approach_dir`'s event stream. Dropping the receiver is
    /// how a client disconnect is modeled (`§7`: in-flight work continues;
    /// only the subscriber is removed).
    pub fn subscribe(&self, approach_dir: &Path) -> broadcast::Receiver<OrchestratorEvent> {
        self.channel(approach_dir).subscribe()
    }

    pub fn publish(&self, approach_dir: &Path, event: OrchestratorEvent) {
        // No receivers is not an error: a `hypergraph_update` for an
        // approach nobody currently watches is simply dropped.
        let _ = self.channel(approach_dir).send(event);
    }
}

/// Loads and validates `approach_dir`'s current graph and broadcasts it as
/// a `hypergraph_update` event. `is_incremental` distinguishes a change-
/// triggered update from the full snapshot sent on first subscribe.
fn broadcast_current_graph(fanout: &Fanout, approach_dir: &Path, is_incremental: bool) {
    let store = Store::open(approach_dir);
    match store.load() {
        Ok((graph, _report)) => {
            let event = OrchestratorEvent::hypergraph_update(approach_dir.display().to_string(), graph, is_incremental);
            fanout.publish(approach_dir, event);
        }
        Err(e) => {
            warn!(approach = %approach_dir.display(), error = %e, "watcher could not load graph after change");
            fanout.publish(approach_dir, OrchestratorEvent::warning(format!("could not reload graph: {e}")));
        }
    }
}

/// Drives the filesystem side of the fan-out: a debounced `notify` watch
/// per approach directory, collapsing a write-temp-then-rename pair into
/// exactly one `hypergraph_update` broadcast (`§8` property 11), plus a
/// listener on the Store's own [`ChangeNotification`] channel so a save
/// made by this process is broadcast immediately rather than waiting on
/// the debounce window.
pub struct Watcher {
    fanout: Arc<Fanout>,
    debounce: Duration,
    debouncers: DashMap<PathBuf, Debouncer<notify::RecommendedWatcher, NoCache>>,
}

impl Watcher {
    pub fn new(fanout: Arc<Fanout>, debounce: Duration) -> Arc<Self> {
        Arc::new(Self {
            fanout,
            debounce,
            debouncers: DashMap::new(),
        })
    }

    pub fn fanout(&self) -> &Arc<Fanout> {
        &self.fanout
    }

    /// Begin watching `approach_dir` for filesystem changes. Idempotent:
    /// watching an already-watched directory is a no-op.
    pub fn watch(self: &Arc<Self>, approach_dir: PathBuf) -> notify::Result<()> {
        if self.debouncers.contains_key(&approach_dir) {
            return Ok(());
        }

        let fanout = self.fanout.clone();
        let dir_for_handler = approach_dir.clone();
        let mut debouncer = new_debouncer(self.debounce, None, move |result: DebounceEventResult| match result {
            Ok(events) => {
                let touches_graph = events.iter().any(|e| {
                    e.paths.iter().any(|p| p.file_name().map(|n| n == "hypergraph.json").unwrap_or(false))
                });
                if touches_graph {
                    debug!(approach = %dir_for_handler.display(), count = events.len(), "debounced graph change");
                    broadcast_current_graph(&fanout, &dir_for_handler, true);
                }
            }
            Err(errors) => {
                for e in errors {
                    error!(approach = %dir_for_handler.display(), error = %e, "watcher error");
                }
            }
        })?;

        debouncer.watcher().watch(&approach_dir, RecursiveMode::NonRecursive)?;
        self.debouncers.insert(approach_dir, debouncer);
        Ok(())
    }

    pub fn unwatch(&self, approach_dir: &Path) {
        self.debouncers.remove(approach_dir);
    }

    /// Spawn the task that listens on a `Store`'s change channel and
    /// broadcasts immediately on every successful `save()`, independent of
    /// the debounced filesystem watch (`§4.1` ambient addition).
    pub fn spawn_change_listener(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<ChangeNotification>) {
        let watcher = self.clone();
        tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                broadcast_current_graph(&watcher.fanout, &change.approach_dir, true);
            }
        });
    }

    /// Send the full current graph to new subscribers immediately, so a
    /// client doesn't wait for the next mutation to see anything.
    pub fn send_initial_snapshot(&self, approach_dir: &Path) {
        broadcast_current_graph(&self.fanout, approach_dir, false);
    }
}
