//! Error types for the swarm subsystem

use thiserror::Error;

/// Main error type for swarm operations
///
/// Network and protocol failures against remote peers are deliberately NOT
/// represented here: peer unavailability is the steady state of an open
/// network, so those surface as structured outcome values instead. An `Err`
/// from a swarm operation means something local went wrong (persistence,
/// configuration, crypto material).
#[derive(Error, Debug)]
pub enum SwarmError {
    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Cryptographic operation failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Identity-related error (keys, signatures)
    #[error("Identity error: {0}")]
    Identity(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using SwarmError
pub type SwarmResult<T> = Result<T, SwarmError>;
