//! Handle registry table

use redb::{ReadableTable, TableDefinition};

use crate::error::SwarmError;
use crate::types::HandleEntry;

use super::Storage;

/// Handle → identity mapping (key: handle, value: serialized HandleEntry)
pub(crate) const HANDLES_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("handle_registry");

impl Storage {
    pub fn save_handle(&self, entry: &HandleEntry) -> Result<(), SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(HANDLES_TABLE)?;
            let serialized = postcard::to_allocvec(entry)
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            table.insert(entry.handle.as_str(), serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn load_handle(&self, handle: &str) -> Result<Option<HandleEntry>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(HANDLES_TABLE)?;

        match table.get(handle)? {
            Some(data) => {
                let entry: HandleEntry = postcard::from_bytes(data.value())
                    .map_err(|e| SwarmError::Serialization(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    pub fn list_handles(&self) -> Result<Vec<HandleEntry>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(HANDLES_TABLE)?;

        let mut entries = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let handle_entry: HandleEntry = postcard::from_bytes(value.value())
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            entries.push(handle_entry);
        }
        Ok(entries)
    }
}
