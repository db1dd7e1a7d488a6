//! History Store
//!
//! Finished reductions, newest first. The store is loaded once when it is created and is
//! written back wholesale after every mutation; persistence is best effort, the in-memory
//! list stays authoritative for the lifetime of the process.
//!

use crate::chrono::{DateTime, Local};
use crate::diff::*;
use crate::ledger::*;
use crate::store::*;
use crate::visualize::*;
use std::fmt::Write;

/// the single key the whole history lives under
pub const HISTORY_KEY: &str = "matrix_history_v1";

pub struct HistoryStore<S: BlobStore> {
    store: S,
    items: Vec<HistoryEntry>,
}

impl<S: BlobStore> HistoryStore<S> {
    /// load the persisted history; anything unreadable starts an empty history
    pub fn load(store: S) -> Self {
        let items = match store.read(HISTORY_KEY) {
            Ok(bytes) if bytes.is_empty() => vec![],
            Ok(bytes) => serde_json::from_slice::<Vec<HistoryEntry>>(&bytes).unwrap_or_else(|error| {
                tracing::warn!(%error, "ignoring malformed history");
                vec![]
            }),
            Err(StoreError::Missing) => vec![],
            Err(error) => {
                tracing::warn!(%error, "cannot load history");
                vec![]
            }
        };
        tracing::debug!(entries = items.len(), "history loaded");
        Self { store, items }
    }

    /// newest first
    pub fn items(&self) -> &[HistoryEntry] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add(&mut self, entry: HistoryEntry) {
        self.items.insert(0, entry);
        tracing::info!(entries = self.items.len(), "history entry added");
        self.persist();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        tracing::info!("history cleared");
        self.persist();
    }

    /// failures are logged and swallowed
    fn persist(&self) {
        let result = serde_json::to_vec(&self.items)
            .map_err(StoreError::from)
            .and_then(|data| self.store.write(HISTORY_KEY, &data));
        if let Err(error) = result {
            tracing::warn!(%error, "history not persisted");
        }
    }
}

/// human readable report of the history, newest first
pub fn render_history(items: &[HistoryEntry]) -> String {
    let mut out = String::new();
    if items.is_empty() {
        out.push_str("No changes yet. Apply a transformation to record one.\n");
        return out;
    }
    for (idx, item) in items.iter().enumerate() {
        let diff = item.diff();
        let time = DateTime::parse_from_rfc3339(&item.timestamp)
            .map(|time| time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| item.timestamp.clone());
        // writing into a String never fails
        let _ = writeln!(out, "Step #{} | {} | changed cells: {}", items.len() - idx, time, diff.count);
        if diff.is_empty() {
            out.push_str("  Matrix unchanged.\n");
        } else {
            for line in diff.summary_lines(DIFF_DISPLAY_LIMIT) {
                let _ = writeln!(out, "  {line}");
            }
        }
        if item.steps.is_empty() {
            out.push_str("  No steps recorded.\n");
        } else {
            out.push_str("  Intermediate steps:\n");
            for (i, step) in item.steps.iter().enumerate() {
                let description = if step.description.is_empty() {
                    "(no description)"
                } else {
                    step.description.as_str()
                };
                let _ = writeln!(out, "  Step {}: {}", i + 1, description);
                for line in matrix_to_string(&step.after).lines() {
                    let _ = writeln!(out, "    {line}");
                }
            }
        }
        out.push('\n');
    }
    out
}
