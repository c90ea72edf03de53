//! Addresses and Program Derived Address (PDA) derivation.
//!
//! Addresses are Base58-encoded 32-byte values. Wallet identities are Ed25519
//! public keys; derived addresses are SHA-256 outputs that are deliberately
//! *off* the Ed25519 curve so that no private key can ever sign for them.

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};

use crate::error::CodecError;

/// Social ledger program: `JE9KDSz5B34CkxB5cEXxpSF6yRB3XzCEdL21xRBArzes`
pub const SOCIAL_PROGRAM_ID: [u8; 32] = [
    0xff, 0xf4, 0xa1, 0x05, 0x47, 0xd6, 0x6c, 0xe5, 0xd3, 0x6c, 0xbd, 0xaa, 0xc8, 0x30,
    0xc8, 0xa2, 0xbc, 0xdf, 0x7f, 0xe8, 0xc9, 0xdd, 0xd2, 0x51, 0x83, 0xfc, 0x95, 0x1b,
    0xda, 0x4d, 0x72, 0x90,
];

/// System Program: 32 zero bytes, `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// Memo Program v2: `MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr`
pub const MEMO_PROGRAM_ID: [u8; 32] = [
    0x05, 0x4a, 0x53, 0x5a, 0x99, 0x29, 0x21, 0x06, 0x4d, 0x24, 0xe8, 0x71, 0x60, 0xda,
    0x38, 0x7c, 0x7c, 0x35, 0xb5, 0xdd, 0xbc, 0x92, 0xbb, 0x81, 0xe4, 0x1f, 0xa8, 0x40,
    0x41, 0x05, 0x44, 0x8d,
];

/// Compute Budget program: `ComputeBudget111111111111111111111111111111`
pub const COMPUTE_BUDGET_PROGRAM_ID: [u8; 32] = [
    0x03, 0x06, 0x46, 0x6f, 0xe5, 0x21, 0x17, 0x32, 0xff, 0xec, 0xad, 0xba, 0x72, 0xc3,
    0x9b, 0xe7, 0xbc, 0x8c, 0xe5, 0xbb, 0xc5, 0xf7, 0x12, 0x6b, 0x2c, 0x43, 0x9b, 0x3a,
    0x40, 0x00, 0x00, 0x00,
];

/// Seed prefix of the per-user account.
pub const USER_SEED: &[u8] = b"user";

const DERIVATION_SUFFIX: &[u8] = b"ProgramDerivedAddress";

// ---------------------------------------------------------------------------
// Base58
// ---------------------------------------------------------------------------

/// Encode 32 bytes as a Base58 address string.
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

/// Decode a Base58 address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], CodecError> {
    let decoded = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| CodecError::InvalidAddress(format!("{address}: {e}")))?;

    decoded.try_into().map_err(|v: Vec<u8>| {
        CodecError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })
}

/// Validate an address string without keeping the decoded bytes.
pub fn validate_address(address: &str) -> Result<bool, CodecError> {
    address_to_bytes(address).map(|_| true)
}

// ---------------------------------------------------------------------------
// PDA derivation
// ---------------------------------------------------------------------------

/// Search bumps 255, 254, ... 0 for the first off-curve derived address.
///
/// Candidate = `SHA-256(seeds.. || bump || program_id || "ProgramDerivedAddress")`.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &[u8; 32],
) -> Result<([u8; 32], u8), CodecError> {
    (0..=u8::MAX)
        .rev()
        .find_map(|bump| derive_with_bump(seeds, bump, program_id).map(|addr| (addr, bump)))
        .ok_or_else(|| CodecError::AddressDerivation("every bump seed hashed onto the curve".into()))
}

/// Derive the per-user account (`["user", owner]`) for `owner`.
pub fn user_address(owner: &[u8; 32], program_id: &[u8; 32]) -> Result<[u8; 32], CodecError> {
    let (address, _) = find_program_address(&[USER_SEED, owner.as_slice()], program_id)?;
    Ok(address)
}

fn derive_with_bump(seeds: &[&[u8]], bump: u8, program_id: &[u8; 32]) -> Option<[u8; 32]> {
    let candidate: [u8; 32] = seeds
        .iter()
        .fold(Sha256::new(), |h, seed| h.chain_update(seed))
        .chain_update([bump])
        .chain_update(program_id)
        .chain_update(DERIVATION_SUFFIX)
        .finalize()
        .into();
    (!is_on_curve(&candidate)).then_some(candidate)
}

/// Whether 32 bytes decompress to an Ed25519 point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}
