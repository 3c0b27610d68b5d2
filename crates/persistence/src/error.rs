//! Persistence error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
