use thiserror::Error;

/// Errors raised while encoding, decoding or deriving data for the social
/// ledger program.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("address derivation failed: {0}")]
    AddressDerivation(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    #[error("content too large: {0}")]
    ContentTooLarge(String),

    #[error("no post found in transaction logs")]
    NoPostFound,

    #[error("inconsistent post: {0}")]
    InconsistentPost(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("transaction too large: {size} bytes exceeds {limit}")]
    TransactionTooLarge { size: usize, limit: usize },

    #[error("serialization error: {0}")]
    Serialization(String),
}
