//! Append-only gossip sync log

use redb::{ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::SwarmError;
use crate::types::SyncLogEntry;

use super::Storage;

/// Sync audit log (key: monotonically increasing sequence number)
pub(crate) const SYNC_LOG_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("sync_log");

impl Storage {
    /// Append one sync log entry, returning its sequence number
    pub fn append_sync_log(&self, entry: &SyncLogEntry) -> Result<u64, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        let seq;
        {
            let mut table = write_txn.open_table(SYNC_LOG_TABLE)?;
            seq = table.last()?.map(|(key, _)| key.value() + 1).unwrap_or(0);
            let serialized = postcard::to_allocvec(entry)
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            table.insert(seq, serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(seq)
    }

    /// The most recent `limit` sync log entries, newest first
    pub fn recent_sync_log(&self, limit: usize) -> Result<Vec<SyncLogEntry>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(SYNC_LOG_TABLE)?;

        let mut entries = Vec::new();
        for entry in table.iter()?.rev() {
            if entries.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            let log_entry: SyncLogEntry = postcard::from_bytes(value.value())
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            entries.push(log_entry);
        }
        Ok(entries)
    }

    /// Total number of sync log entries
    pub fn sync_log_len(&self) -> Result<u64, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(SYNC_LOG_TABLE)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{now_millis, SyncDirection};
    use tempfile::tempdir;

    fn entry(domain: &str, success: bool) -> SyncLogEntry {
        SyncLogEntry {
            remote_domain: domain.to_string(),
            direction: SyncDirection::Push,
            nodes_sent: 3,
            nodes_received: 2,
            handles_sent: 1,
            handles_received: 0,
            success,
            error: if success { None } else { Some("timeout".to_string()) },
            duration_ms: 120,
            created_at: now_millis(),
        }
    }

    #[test]
    fn test_append_assigns_increasing_seq() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("test.db")).unwrap();

        assert_eq!(storage.append_sync_log(&entry("a.example", true)).unwrap(), 0);
        assert_eq!(storage.append_sync_log(&entry("b.example", false)).unwrap(), 1);
        assert_eq!(storage.sync_log_len().unwrap(), 2);
    }

    #[test]
    fn test_recent_newest_first() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("test.db")).unwrap();

        for i in 0..5 {
            storage
                .append_sync_log(&entry(&format!("n{}.example", i), true))
                .unwrap();
        }

        let recent = storage.recent_sync_log(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].remote_domain, "n4.example");
        assert_eq!(recent[1].remote_domain, "n3.example");
    }

    #[test]
    fn test_failure_entries_keep_error_text() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("test.db")).unwrap();

        storage.append_sync_log(&entry("a.example", false)).unwrap();
        let recent = storage.recent_sync_log(1).unwrap();
        assert!(!recent[0].success);
        assert_eq!(recent[0].error.as_deref(), Some("timeout"));
    }
}
