//! Error types for the delivery ledger

use crate::types::{DeliveryId, UserId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller lacks the required role or ownership
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced delivery has no record
    #[error("Delivery not found: {0}")]
    NotFound(DeliveryId),

    /// Delivery ID already has a record
    #[error("Delivery already initialized: {0}")]
    AlreadyInitialized(DeliveryId),

    /// Mutating operation on a completed record
    #[error("Delivery already completed: {0}")]
    AlreadyCompleted(DeliveryId),

    /// Global pause flag is set
    #[error("Ledger is paused")]
    Paused,

    /// Status value outside the closed status set
    #[error("Invalid status value: {0:?}")]
    InvalidStatus(String),

    /// Required coordinate field is empty
    #[error("Coordinate must be non-empty: {0}")]
    EmptyCoordinate(&'static str),

    /// Event log already holds the maximum number of entries
    #[error("Event log limit reached for delivery {0}")]
    LogLimitExceeded(DeliveryId),

    /// Role grant already holds the maximum number of entries
    #[error("Role capacity exceeded for user {user} on delivery {delivery_id}")]
    RoleCapacityExceeded {
        /// Target user of the grant
        user: UserId,
        /// Delivery the grant is scoped to
        delivery_id: DeliveryId,
    },

    /// Oracle allowlist already holds the maximum number of identities
    #[error("Oracle registry is full")]
    OracleCapacityExceeded,

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
