//! Bootstrap seed table

use redb::{ReadableTable, TableDefinition};

use crate::error::SwarmError;
use crate::types::SeedNode;

use super::Storage;

/// Configured seed nodes (key: domain, value: serialized SeedNode)
pub(crate) const SEEDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("seed_nodes");

impl Storage {
    pub fn save_seed(&self, seed: &SeedNode) -> Result<(), SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(SEEDS_TABLE)?;
            let serialized = postcard::to_allocvec(seed)
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            table.insert(seed.domain.as_str(), serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn load_seed(&self, domain: &str) -> Result<Option<SeedNode>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(SEEDS_TABLE)?;

        match table.get(domain)? {
            Some(data) => {
                let seed: SeedNode = postcard::from_bytes(data.value())
                    .map_err(|e| SwarmError::Serialization(e.to_string()))?;
                Ok(Some(seed))
            }
            None => Ok(None),
        }
    }

    pub fn list_seeds(&self) -> Result<Vec<SeedNode>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(SEEDS_TABLE)?;

        let mut seeds = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let seed: SeedNode = postcard::from_bytes(value.value())
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            seeds.push(seed);
        }
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_load_list() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("test.db")).unwrap();

        storage.save_seed(&SeedNode::new("seed2.example", 1)).unwrap();
        storage.save_seed(&SeedNode::new("seed1.example", 0)).unwrap();

        let loaded = storage.load_seed("seed1.example").unwrap().unwrap();
        assert_eq!(loaded.priority, 0);
        assert_eq!(storage.list_seeds().unwrap().len(), 2);
    }
}
