//! Persistent storage using redb.
//!
//! This module provides ACID-compliant storage for:
//! - The node registry (known peers with health and trust state)
//! - Bootstrap seed nodes
//! - The append-only gossip sync log
//! - The handle registry (handle → DID → home node)
//! - Cached user public keys
//! - The node's own sealed keypair
//! - Seen interaction ids (inbound idempotency)

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use redb::Database;

use crate::error::SwarmError;

// Submodules
mod handles;
mod keys;
mod nodes;
mod seeds;
mod sync_log;

use handles::HANDLES_TABLE;
use keys::{IDENTITY_TABLE, SEEN_INTERACTIONS_TABLE, USER_KEYS_TABLE};
use nodes::NODES_TABLE;
use seeds::SEEDS_TABLE;
use sync_log::SYNC_LOG_TABLE;

/// Storage layer using redb for ACID-compliant persistence
#[derive(Clone)]
pub struct Storage {
    db: Arc<RwLock<Database>>,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// Creates the parent directory and all required tables if needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SwarmError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(NODES_TABLE)?;
            let _ = write_txn.open_table(SEEDS_TABLE)?;
            let _ = write_txn.open_table(SYNC_LOG_TABLE)?;
            let _ = write_txn.open_table(HANDLES_TABLE)?;
            let _ = write_txn.open_table(USER_KEYS_TABLE)?;
            let _ = write_txn.open_table(IDENTITY_TABLE)?;
            let _ = write_txn.open_table(SEEN_INTERACTIONS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Shared database handle used by the table-specific impl blocks
    pub(crate) fn db_handle(&self) -> Arc<RwLock<Database>> {
        self.db.clone()
    }
}
