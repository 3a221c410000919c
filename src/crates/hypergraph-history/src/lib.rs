//! Timestamped version history for one approach's `hypergraph.json`.
//!
//! The Hypergraph Store (`hypergraph-core`) snapshots the file it is about
//! to overwrite into this crate's [`HistoryStore`] before every atomic
//! write, so `history/` always holds every prior version of the graph in
//! capture order. This crate knows nothing about claims or implications —
//! it treats a snapshot as an opaque byte blob, the same way the Watcher
//! treats `hypergraph.json` itself as an opaque file to react to.

pub mod error;
pub mod snapshot;

pub use error::{HistoryError, Result};
pub use snapshot::{HistoryEntry, HistoryStore};
