//! Async client for the F4H social ledger program.
//!
//! [`SocialClient`] turns request-level intents (create a user, post text,
//! like, move lamports, read back) into signed transactions built with
//! `social-codec`, and submits them through a [`LedgerRpc`] collaborator.

pub mod amount;
pub mod assembler;
pub mod authority;
pub mod client;
pub mod config;
pub mod error;
pub mod rpc;

pub use amount::{lamports_to_sol, sol_to_lamports, LAMPORTS_PER_SOL};
pub use assembler::{await_visible, submit, Visibility};
pub use authority::Authority;
pub use client::{
    ChunkSummary, InitUserReceipt, PostReceipt, SocialClient, TransferReceipt, UserAccount,
};
pub use config::{Commitment, Config, EnabledOperations, Operation};
pub use error::{ClientError, RpcError};
pub use rpc::{AccountData, JsonRpcClient, LedgerRpc};
