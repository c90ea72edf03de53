//! Message compilation, signing and the legacy wire format.
//!
//! Layout of a signed transaction as sent to the cluster:
//!
//! ```text
//! [compact-u16 signature count = 1]
//! [64-byte Ed25519 signature of the message]
//! message
//!   header                  3 x u8 (required sigs, ro signed, ro unsigned)
//!   keys                    compact-u16 count, then 32 bytes each
//!   recent blockhash        32 bytes
//!   instructions            compact-u16 count, then per instruction:
//!     program key index     u8
//!     account key indices   compact-u16 count, then u8 each
//!     data                  compact-u16 length, then bytes
//! ```
//!
//! Every submission carries two Compute Budget instructions ahead of the
//! caller's instructions: a compute-unit ceiling and a compute-unit price.

use ed25519_dalek::Signer;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::address::COMPUTE_BUDGET_PROGRAM_ID;
use crate::error::CodecError;

/// Maximum serialized transaction size accepted by the cluster.
pub const PACKET_DATA_SIZE: usize = 1232;

/// Compute Budget `SetComputeUnitLimit` discriminator.
const SET_COMPUTE_UNIT_LIMIT: u8 = 2;
/// Compute Budget `SetComputeUnitPrice` discriminator.
const SET_COMPUTE_UNIT_PRICE: u8 = 3;

/// Append `value` as a compact-u16: 7 bits per byte, high bit = more follows.
pub fn put_compact_u16(buf: &mut Vec<u8>, value: u16) {
    let mut rest = value;
    while rest >= 0x80 {
        buf.push((rest & 0x7f) as u8 | 0x80);
        rest >>= 7;
    }
    buf.push(rest as u8);
}

fn put_len(buf: &mut Vec<u8>, len: usize, what: &str) -> Result<(), CodecError> {
    let len = u16::try_from(len)
        .map_err(|_| CodecError::Serialization(format!("{what} length {len} overflows u16")))?;
    put_compact_u16(buf, len);
    Ok(())
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
///
/// Roles merge upward when the same key appears in several instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// Signs and pays, e.g. the fee payer.
    pub fn signer_writable(pubkey: [u8; 32]) -> Self {
        Self {
            pubkey,
            is_signer: true,
            is_writable: true,
        }
    }

    /// Mutated by the program but not a signer.
    pub fn writable(pubkey: [u8; 32]) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: true,
        }
    }

    /// Read-only, non-signing: owners, programs, sysvars.
    pub fn readonly(pubkey: [u8; 32]) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: [u8; 32],
    /// In the order the program expects them.
    pub accounts: Vec<AccountMeta>,
    /// Opaque to the compiler; for the social program this is a packed
    /// [`SocialInstruction`](crate::instruction::SocialInstruction).
    pub data: Vec<u8>,
}

/// Compute-unit ceiling and price attached to every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeBudget {
    pub compute_unit_limit: u32,
    /// Micro-lamports per compute unit.
    pub compute_unit_price: u64,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            compute_unit_limit: 400_000,
            compute_unit_price: 0,
        }
    }
}

/// The three counts that open every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub required_signatures: u8,
    /// Trailing signers that are read-only.
    pub readonly_signed: u8,
    /// Trailing non-signers that are read-only.
    pub readonly_unsigned: u8,
}

/// A compiled, unsigned legacy message.
///
/// `account_keys` is ordered writable signers, read-only signers, writable
/// non-signers, read-only non-signers; the fee payer is always key 0.
#[derive(Debug, Clone)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<[u8; 32]>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

/// Instruction with its program and accounts replaced by key indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index of the program id in `account_keys`.
    pub program_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// Wire bytes of a signed transaction plus its signature.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// `compact(1) | signature | message`, ready for `sendTransaction`.
    pub wire: Vec<u8>,
    pub signature: [u8; 64],
}

impl SignedTransaction {
    /// Base58 form of the signature, which is also the transaction id.
    pub fn signature_string(&self) -> String {
        bs58::encode(self.signature).into_string()
    }
}

// ---------------------------------------------------------------------------
// Compute budget
// ---------------------------------------------------------------------------

/// `SetComputeUnitLimit`: `[2, u32 LE]`, no accounts.
pub fn compute_unit_limit_instruction(units: u32) -> Instruction {
    let mut data = Vec::with_capacity(5);
    data.push(SET_COMPUTE_UNIT_LIMIT);
    data.extend_from_slice(&units.to_le_bytes());
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: Vec::new(),
        data,
    }
}

/// `SetComputeUnitPrice`: `[3, u64 LE]`, no accounts.
pub fn compute_unit_price_instruction(micro_lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(SET_COMPUTE_UNIT_PRICE);
    data.extend_from_slice(&micro_lamports.to_le_bytes());
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: Vec::new(),
        data,
    }
}

/// Prepend the limit and price instructions, in that order.
pub fn with_compute_budget(budget: ComputeBudget, instructions: &[Instruction]) -> Vec<Instruction> {
    let mut all = Vec::with_capacity(instructions.len() + 2);
    all.push(compute_unit_limit_instruction(budget.compute_unit_limit));
    all.push(compute_unit_price_instruction(budget.compute_unit_price));
    all.extend_from_slice(instructions);
    all
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

/// Deduplicated account keys with merged signer/writable roles, in first-seen
/// order.
#[derive(Default)]
struct KeyTable {
    keys: Vec<([u8; 32], bool, bool)>,
}

impl KeyTable {
    fn touch(&mut self, key: [u8; 32], signer: bool, writable: bool) {
        match self.keys.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, s, w)) => {
                *s |= signer;
                *w |= writable;
            }
            None => self.keys.push((key, signer, writable)),
        }
    }

    /// Sort into message order and count the header.
    fn finish(mut self) -> Result<(MessageHeader, Vec<[u8; 32]>), CodecError> {
        if self.keys.len() > usize::from(u8::MAX) {
            return Err(CodecError::TransactionBuild(format!(
                "{} accounts exceed the 255 a message can index",
                self.keys.len()
            )));
        }

        // Stable: first-seen order survives inside each class.
        self.keys
            .sort_by_key(|&(_, signer, writable)| (!signer, !writable));

        let mut header = MessageHeader::default();
        for &(_, signer, writable) in &self.keys {
            match (signer, writable) {
                (true, true) => header.required_signatures += 1,
                (true, false) => {
                    header.required_signatures += 1;
                    header.readonly_signed += 1;
                }
                (false, false) => header.readonly_unsigned += 1,
                (false, true) => {}
            }
        }
        Ok((header, self.keys.into_iter().map(|(k, _, _)| k).collect()))
    }
}

/// Compile `instructions` into a legacy message paid for by `fee_payer`.
pub fn compile_transaction(
    instructions: &[Instruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<Message, CodecError> {
    let mut table = KeyTable::default();
    table.touch(*fee_payer, true, true);
    for ix in instructions {
        ix.accounts
            .iter()
            .for_each(|meta| table.touch(meta.pubkey, meta.is_signer, meta.is_writable));
        table.touch(ix.program_id, false, false);
    }
    let (header, account_keys) = table.finish()?;

    let index = |key: &[u8; 32]| {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| CodecError::TransactionBuild("key missing from message".into()))
    };

    let compiled = instructions
        .iter()
        .map(|ix| -> Result<CompiledInstruction, CodecError> {
            Ok(CompiledInstruction {
                program_index: index(&ix.program_id)?,
                account_indices: ix
                    .accounts
                    .iter()
                    .map(|meta| index(&meta.pubkey))
                    .collect::<Result<_, CodecError>>()?,
                data: ix.data.clone(),
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    Ok(Message {
        header,
        account_keys,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    })
}

/// The bytes covered by the signature.
pub fn serialize_message(message: &Message) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(3 + 33 * message.account_keys.len() + 64);
    let MessageHeader {
        required_signatures,
        readonly_signed,
        readonly_unsigned,
    } = message.header;
    out.extend_from_slice(&[required_signatures, readonly_signed, readonly_unsigned]);

    put_len(&mut out, message.account_keys.len(), "account keys")?;
    message.account_keys.iter().for_each(|k| out.extend_from_slice(k));
    out.extend_from_slice(&message.recent_blockhash);

    put_len(&mut out, message.instructions.len(), "instructions")?;
    for ix in &message.instructions {
        out.push(ix.program_index);
        put_len(&mut out, ix.account_indices.len(), "instruction accounts")?;
        out.extend_from_slice(&ix.account_indices);
        put_len(&mut out, ix.data.len(), "instruction data")?;
        out.extend_from_slice(&ix.data);
    }
    Ok(out)
}

/// Sign `message` with the fee payer's 32-byte Ed25519 seed and produce the
/// wire bytes. Fails if the result would not fit in [`PACKET_DATA_SIZE`].
pub fn sign_transaction(
    message: &Message,
    fee_payer_seed: &[u8; 32],
) -> Result<SignedTransaction, CodecError> {
    if message.header.required_signatures != 1 {
        return Err(CodecError::TransactionBuild(format!(
            "single-signer messages only, this one needs {}",
            message.header.required_signatures
        )));
    }

    let mut seed = *fee_payer_seed;
    let key = ed25519_dalek::SigningKey::from_bytes(&seed);
    seed.zeroize();
    if message.account_keys.first() != Some(&key.verifying_key().to_bytes()) {
        return Err(CodecError::TransactionBuild(
            "signing key does not match fee payer".into(),
        ));
    }

    let body = serialize_message(message)?;
    let signature = key.sign(&body).to_bytes();

    let mut wire = Vec::with_capacity(65 + body.len());
    put_compact_u16(&mut wire, 1);
    wire.extend_from_slice(&signature);
    wire.extend_from_slice(&body);

    if wire.len() > PACKET_DATA_SIZE {
        return Err(CodecError::TransactionTooLarge {
            size: wire.len(),
            limit: PACKET_DATA_SIZE,
        });
    }
    Ok(SignedTransaction { wire, signature })
}
