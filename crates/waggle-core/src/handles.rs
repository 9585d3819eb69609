//! Handle directory
//!
//! The global handle → DID → home-node mapping, propagated as gossip
//! deltas. Conflicts resolve last-write-wins by `updated_at`; an older
//! delta never overwrites a newer local entry.

use tracing::debug;

use crate::error::SwarmResult;
use crate::storage::Storage;
use crate::types::{HandleEntry, UpsertStats};

#[derive(Clone)]
pub struct HandleDirectory {
    storage: Storage,
}

impl HandleDirectory {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Apply a batch of handle deltas with last-write-wins semantics
    pub fn upsert_entries(&self, entries: &[HandleEntry]) -> SwarmResult<UpsertStats> {
        let mut stats = UpsertStats::default();
        for entry in entries {
            match self.storage.load_handle(&entry.handle)? {
                Some(existing) => {
                    if entry.updated_at > existing.updated_at {
                        self.storage.save_handle(entry)?;
                        stats.updated += 1;
                    } else {
                        debug!(handle = %entry.handle, "Stale handle delta ignored");
                    }
                }
                None => {
                    self.storage.save_handle(entry)?;
                    stats.added += 1;
                }
            }
        }
        Ok(stats)
    }

    pub fn get(&self, handle: &str) -> SwarmResult<Option<HandleEntry>> {
        self.storage.load_handle(handle)
    }

    /// Entries updated strictly after `since`, for gossip deltas
    pub fn list_since(&self, since: i64, limit: usize) -> SwarmResult<Vec<HandleEntry>> {
        let mut entries: Vec<HandleEntry> = self
            .storage
            .list_handles()?
            .into_iter()
            .filter(|e| e.updated_at > since)
            .collect();
        entries.sort_by_key(|e| e.updated_at);
        entries.truncate(limit);
        Ok(entries)
    }

    /// Find the entry owning a DID, if any.
    ///
    /// Linear scan; the directory is small relative to content tables and
    /// this path only runs during self-healing.
    pub fn find_by_did(&self, did: &str) -> SwarmResult<Option<HandleEntry>> {
        Ok(self
            .storage
            .list_handles()?
            .into_iter()
            .find(|e| e.did == did))
    }

    pub fn len(&self) -> SwarmResult<usize> {
        Ok(self.storage.list_handles()?.len())
    }

    pub fn is_empty(&self) -> SwarmResult<bool> {
        Ok(self.len()? == 0)
    }
}
