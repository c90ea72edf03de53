//! Wire codec for the F4H social ledger program.
//!
//! This crate holds everything that can be computed without touching the
//! network: derived user addresses, the six program instructions, chunked
//! posts and their reconstruction from memo logs, and the hand-rolled
//! transaction wire format (compute budget, compilation, Ed25519 signing).
//!
//! Like the rest of the workspace it avoids `solana-sdk`; the binary layouts
//! are small enough to write out directly.

pub mod address;
pub mod error;
pub mod instruction;
pub mod post;
pub mod transaction;

pub use address::{
    address_to_bytes, bytes_to_address, find_program_address, user_address, validate_address,
    COMPUTE_BUDGET_PROGRAM_ID, MEMO_PROGRAM_ID, SOCIAL_PROGRAM_ID, SYSTEM_PROGRAM_ID,
};
pub use error::CodecError;
pub use instruction::{InstructionBuilder, SocialInstruction, UserProfile};
pub use post::{format_memo, parse_memo_line, reassemble, split, PostBody, PostChunk, ReassembledPost};
pub use transaction::{
    compile_transaction, sign_transaction, with_compute_budget, AccountMeta, ComputeBudget,
    Instruction, Message, SignedTransaction, PACKET_DATA_SIZE,
};
