//! Identity row, cached user keys, and inbound interaction idempotency

use redb::{ReadableTable, TableDefinition};

use crate::error::SwarmError;
use crate::identity::StoredKeypair;
use crate::types::now_millis;

use super::Storage;

/// Node's own sealed keypair (single row under [`KEYPAIR_KEY`])
pub(crate) const IDENTITY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("identity");

/// Cached user public keys (key: "handle@domain", value: hex key)
pub(crate) const USER_KEYS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("user_keys");

/// Interaction ids already processed (key: interaction id, value: seen-at ms)
pub(crate) const SEEN_INTERACTIONS_TABLE: TableDefinition<&str, i64> =
    TableDefinition::new("seen_interactions");

const KEYPAIR_KEY: &str = "node_keypair";

fn user_key_index(handle: &str, domain: &str) -> String {
    format!("{handle}@{domain}")
}

impl Storage {
    /// Persist the node's sealed keypair (plain upsert)
    pub fn save_node_keypair(&self, keypair: &StoredKeypair) -> Result<(), SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(IDENTITY_TABLE)?;
            let serialized = postcard::to_allocvec(keypair)
                .map_err(|e| SwarmError::Serialization(e.to_string()))?;
            table.insert(KEYPAIR_KEY, serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load the node's sealed keypair, if one has been generated
    pub fn load_node_keypair(&self) -> Result<Option<StoredKeypair>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(IDENTITY_TABLE)?;

        match table.get(KEYPAIR_KEY)? {
            Some(data) => {
                let keypair: StoredKeypair = postcard::from_bytes(data.value())
                    .map_err(|e| SwarmError::Serialization(e.to_string()))?;
                Ok(Some(keypair))
            }
            None => Ok(None),
        }
    }

    /// Cache a user's public key (insert-or-update)
    pub fn save_user_key(
        &self,
        handle: &str,
        domain: &str,
        public_key_hex: &str,
    ) -> Result<(), SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_KEYS_TABLE)?;
            table.insert(user_key_index(handle, domain).as_str(), public_key_hex)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Fetch a cached user public key
    pub fn load_user_key(&self, handle: &str, domain: &str) -> Result<Option<String>, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(USER_KEYS_TABLE)?;

        Ok(table
            .get(user_key_index(handle, domain).as_str())?
            .map(|v| v.value().to_string()))
    }

    /// Record an inbound interaction id.
    ///
    /// Returns `true` if the id was new, `false` if it was already seen.
    /// This is the receiving-side deduplication for at-least-once delivery.
    pub fn record_interaction_id(&self, interaction_id: &str) -> Result<bool, SwarmError> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        let is_new;
        {
            let mut table = write_txn.open_table(SEEN_INTERACTIONS_TABLE)?;
            is_new = table.get(interaction_id)?.is_none();
            if is_new {
                table.insert(interaction_id, now_millis())?;
            }
        }
        write_txn.commit()?;
        Ok(is_new)
    }
}
