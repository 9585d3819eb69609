//! Node registry table
//!
//! Raw CRUD for [`SwarmNode`] records, keyed by domain. Merge policy and
//! trust arithmetic live in [`crate::registry::NodeRegistry`]; this layer
//! only moves bytes.

use redb::{ReadableTable, TableDefinition};

use crate::error::SwarmError;
use crate::types::SwarmNode;

use super::Storage;

/// Known peer nodes (key: domain, value: serialized SwarmNode)
pub(crate) const NODES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("swarm_nodes");

impl Storage {
    /// Save a node record, overwriting any existing entry for its domain
    pub fn save_node(&self, node: &SwarmNode) -> Result<(), SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(NODES_TABLE)?;
            let serialized = postcard::to_allocvec(node)
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            table.insert(node.domain.as_str(), serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a node record by domain
    pub fn load_node(&self, domain: &str) -> Result<Option<SwarmNode>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(NODES_TABLE)?;

        match table.get(domain)? {
            Some(data) => {
                let node: SwarmNode = postcard::from_bytes(data.value())
                    .map_err(|e| SwarmError::Serialization(e.to_string()))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// List all node records
    pub fn list_nodes(&self) -> Result<Vec<SwarmNode>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(NODES_TABLE)?;

        let mut nodes = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let node: SwarmNode = postcard::from_bytes(value.value())
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Count all node records
    pub fn count_nodes(&self) -> Result<usize, SwarmError> {
        Ok(self.list_nodes()?.len())
    }
}
