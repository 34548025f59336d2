//! Store error types.

use fulfillment_core::FulfillmentError;
use thiserror::Error;

/// Errors raised by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A write would break a table invariant.
    #[error("Constraint violated on {table}: {message}")]
    Constraint {
        table: &'static str,
        message: String,
    },

    /// A unique key is already taken.
    #[error("Duplicate key in {table}: {key}")]
    DuplicateKey { table: &'static str, key: String },

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transaction was already committed or aborted.
    #[error("Transaction already finished")]
    Finished,
}

impl StoreError {
    pub fn constraint(table: &'static str, message: impl Into<String>) -> Self {
        StoreError::Constraint {
            table,
            message: message.into(),
        }
    }

    pub fn duplicate(table: &'static str, key: impl Into<String>) -> Self {
        StoreError::DuplicateKey {
            table,
            key: key.into(),
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(e: StoreError) -> Self {
        FulfillmentError::Internal(e.to_string())
    }
}
