use social_codec::CodecError;
use thiserror::Error;

use crate::config::Operation;

/// Failures talking to the ledger RPC endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("rpc read failed: {0}")]
    Rpc(#[from] RpcError),

    /// The single submission attempt was rejected or never reached the ledger.
    #[error("submission failed: {0}")]
    SubmissionFailed(#[source] RpcError),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("operation disabled: {0}")]
    OperationDisabled(Operation),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),
}
