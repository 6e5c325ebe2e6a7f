use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Metadata error: {0}")]
    MetadataError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Key error: {0}")]
    KeyError(String),
}

impl From<codec::Error> for BlockchainError {
    fn from(err: codec::Error) -> Self {
        BlockchainError::DecodeError(err.to_string())
    }
}
