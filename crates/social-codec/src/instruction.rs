//! Social ledger program instructions and the stored user record.
//!
//! Every instruction starts with a one-byte tag followed by a fixed,
//! little-endian payload:
//!
//! ```text
//! 2 init-user    username[32] | posts u64 | likes_recv u64 | likes_given u64
//! 3 update-user  username[32] | posts u64 | likes_recv u64 | likes_given u64
//! 4 deposit      lamports u64
//! 5 withdraw     lamports u64
//! 6 post-chunk   owner[32] | is_head u8 | chunk_id u16 | chunk_total u16 | len u16 | bytes
//! 7 like         post_owner[32] | post_seq u64 | liker[32] | timestamp u64
//! ```

use serde::Serialize;

use crate::address::{user_address, MEMO_PROGRAM_ID, SYSTEM_PROGRAM_ID};
use crate::error::CodecError;
use crate::post::PostChunk;
use crate::transaction::{AccountMeta, Instruction};

pub const TAG_INIT_USER: u8 = 2;
pub const TAG_UPDATE_USER: u8 = 3;
pub const TAG_DEPOSIT: u8 = 4;
pub const TAG_WITHDRAW: u8 = 5;
pub const TAG_POST_CHUNK: u8 = 6;
pub const TAG_LIKE: u8 = 7;

/// Fixed width of the stored username.
pub const USERNAME_LEN: usize = 32;

/// Stored user record: `username[32] | posts u64 | likes_recv u64 | likes_given u64`.
pub const USER_RECORD_LEN: usize = USERNAME_LEN + 8 * 3;

/// Bytes of a post-chunk payload before the content.
const POST_HEADER_LEN: usize = 32 + 1 + 2 + 2 + 2;

// ---------------------------------------------------------------------------
// Instruction payloads
// ---------------------------------------------------------------------------

/// Decoded form of one program instruction's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocialInstruction {
    /// Tag 2. Creates the user record; counters are packed as zero.
    InitUser {
        username: [u8; USERNAME_LEN],
    },
    /// Tag 3. Overwrites username and all three counters.
    UpdateUser {
        username: [u8; USERNAME_LEN],
        posts_created: u64,
        likes_received: u64,
        likes_given: u64,
    },
    /// Tag 4. Payer to user escrow.
    Deposit {
        lamports: u64,
    },
    /// Tag 5. User escrow to owner.
    Withdraw {
        lamports: u64,
    },
    /// Tag 6. One chunk of a post; `content` is at most `u16::MAX` bytes.
    PostChunk {
        owner: [u8; 32],
        is_head: bool,
        chunk_id: u16,
        chunk_total: u16,
        content: Vec<u8>,
    },
    /// Tag 7. `timestamp` is Unix seconds chosen by the client.
    Like {
        post_owner: [u8; 32],
        post_seq: u64,
        liker: [u8; 32],
        timestamp: u64,
    },
}

impl SocialInstruction {
    /// Leading byte of the packed data.
    pub fn tag(&self) -> u8 {
        match self {
            SocialInstruction::InitUser { .. } => TAG_INIT_USER,
            SocialInstruction::UpdateUser { .. } => TAG_UPDATE_USER,
            SocialInstruction::Deposit { .. } => TAG_DEPOSIT,
            SocialInstruction::Withdraw { .. } => TAG_WITHDRAW,
            SocialInstruction::PostChunk { .. } => TAG_POST_CHUNK,
            SocialInstruction::Like { .. } => TAG_LIKE,
        }
    }

    /// Serialize to instruction data.
    ///
    /// Fails only when post content does not fit the u16 length field.
    pub fn pack(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(self.packed_len());
        buf.push(self.tag());

        match self {
            SocialInstruction::InitUser { username } => {
                buf.extend_from_slice(username);
                // Counters always start at zero.
                buf.extend_from_slice(&[0u8; 24]);
            }
            SocialInstruction::UpdateUser {
                username,
                posts_created,
                likes_received,
                likes_given,
            } => {
                buf.extend_from_slice(username);
                buf.extend_from_slice(&posts_created.to_le_bytes());
                buf.extend_from_slice(&likes_received.to_le_bytes());
                buf.extend_from_slice(&likes_given.to_le_bytes());
            }
            SocialInstruction::Deposit { lamports } | SocialInstruction::Withdraw { lamports } => {
                buf.extend_from_slice(&lamports.to_le_bytes());
            }
            SocialInstruction::PostChunk {
                owner,
                is_head,
                chunk_id,
                chunk_total,
                content,
            } => {
                let len = u16::try_from(content.len()).map_err(|_| {
                    CodecError::ContentTooLarge(format!(
                        "chunk content of {} bytes overflows u16",
                        content.len()
                    ))
                })?;
                buf.extend_from_slice(owner);
                buf.push(u8::from(*is_head));
                buf.extend_from_slice(&chunk_id.to_le_bytes());
                buf.extend_from_slice(&chunk_total.to_le_bytes());
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(content);
            }
            SocialInstruction::Like {
                post_owner,
                post_seq,
                liker,
                timestamp,
            } => {
                buf.extend_from_slice(post_owner);
                buf.extend_from_slice(&post_seq.to_le_bytes());
                buf.extend_from_slice(liker);
                buf.extend_from_slice(&timestamp.to_le_bytes());
            }
        }

        Ok(buf)
    }

    fn packed_len(&self) -> usize {
        1 + match self {
            SocialInstruction::InitUser { .. } | SocialInstruction::UpdateUser { .. } => {
                USER_RECORD_LEN
            }
            SocialInstruction::Deposit { .. } | SocialInstruction::Withdraw { .. } => 8,
            SocialInstruction::PostChunk { content, .. } => POST_HEADER_LEN + content.len(),
            SocialInstruction::Like { .. } => 32 + 8 + 32 + 8,
        }
    }

    /// Parse instruction data back into its fields.
    ///
    /// The embedded post `content_len` is checked against the bytes that
    /// actually follow it.
    pub fn unpack(data: &[u8]) -> Result<Self, CodecError> {
        let (&tag, rest) = data
            .split_first()
            .ok_or_else(|| CodecError::InvalidInstruction("empty instruction data".into()))?;
        let mut reader = Reader::new(rest);

        let ix = match tag {
            TAG_INIT_USER => {
                let username = reader.array::<USERNAME_LEN>()?;
                let counters = [reader.u64()?, reader.u64()?, reader.u64()?];
                if counters != [0, 0, 0] {
                    return Err(CodecError::InvalidInstruction(
                        "init-user counters must be zero".into(),
                    ));
                }
                SocialInstruction::InitUser { username }
            }
            TAG_UPDATE_USER => SocialInstruction::UpdateUser {
                username: reader.array::<USERNAME_LEN>()?,
                posts_created: reader.u64()?,
                likes_received: reader.u64()?,
                likes_given: reader.u64()?,
            },
            TAG_DEPOSIT => SocialInstruction::Deposit {
                lamports: reader.u64()?,
            },
            TAG_WITHDRAW => SocialInstruction::Withdraw {
                lamports: reader.u64()?,
            },
            TAG_POST_CHUNK => {
                let owner = reader.array::<32>()?;
                let is_head = match reader.u8()? {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(CodecError::InvalidInstruction(format!(
                            "is_head must be 0 or 1, got {other}"
                        )))
                    }
                };
                let chunk_id = reader.u16()?;
                let chunk_total = reader.u16()?;
                let len = reader.u16()? as usize;
                if len > reader.remaining() {
                    return Err(CodecError::InvalidInstruction(format!(
                        "content_len {len} exceeds remaining {} bytes",
                        reader.remaining()
                    )));
                }
                SocialInstruction::PostChunk {
                    owner,
                    is_head,
                    chunk_id,
                    chunk_total,
                    content: reader.take(len)?.to_vec(),
                }
            }
            TAG_LIKE => SocialInstruction::Like {
                post_owner: reader.array::<32>()?,
                post_seq: reader.u64()?,
                liker: reader.array::<32>()?,
                timestamp: reader.u64()?,
            },
            other => {
                return Err(CodecError::InvalidInstruction(format!("unknown tag {other}")));
            }
        };

        if reader.remaining() != 0 {
            return Err(CodecError::InvalidInstruction(format!(
                "{} trailing bytes after tag {tag}",
                reader.remaining()
            )));
        }
        Ok(ix)
    }
}

/// Pack a username into the fixed 32-byte NUL-padded field.
///
/// Names longer than 32 bytes are cut at the last character boundary that
/// fits, so the stored bytes stay valid UTF-8.
pub fn pack_username(name: &str) -> [u8; USERNAME_LEN] {
    let mut end = name.len().min(USERNAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = [0u8; USERNAME_LEN];
    out[..end].copy_from_slice(&name.as_bytes()[..end]);
    out
}

/// Username bytes up to the first NUL, decoded lossily.
pub fn unpack_username(raw: &[u8; USERNAME_LEN]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(USERNAME_LEN);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

// ---------------------------------------------------------------------------
// Stored user record
// ---------------------------------------------------------------------------

/// The per-user record held in the user's derived account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub posts_created: u64,
    pub likes_received: u64,
    pub likes_given: u64,
}

impl UserProfile {
    /// Decode raw account data. Bytes past the fixed record are ignored.
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        if raw.len() < USER_RECORD_LEN {
            return Err(CodecError::MalformedRecord(format!(
                "expected at least {USER_RECORD_LEN} bytes, got {}",
                raw.len()
            )));
        }
        let mut reader = Reader::new(raw);
        let username = unpack_username(&reader.array::<USERNAME_LEN>()?);
        Ok(Self {
            username,
            posts_created: reader.u64()?,
            likes_received: reader.u64()?,
            likes_given: reader.u64()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Instruction builder
// ---------------------------------------------------------------------------

/// Builds complete program instructions (data + account metas).
///
/// User addresses are re-derived on every call from `program_id`.
#[derive(Debug, Clone, Copy)]
pub struct InstructionBuilder {
    pub program_id: [u8; 32],
    pub payer: [u8; 32],
}

impl InstructionBuilder {
    /// Builder for `program_id` with `payer` as fee payer and sole signer.
    pub fn new(program_id: [u8; 32], payer: [u8; 32]) -> Self {
        Self { program_id, payer }
    }

    pub fn user_address(&self, owner: &[u8; 32]) -> Result<[u8; 32], CodecError> {
        user_address(owner, &self.program_id)
    }

    /// accounts = [payer (s,w), owner (r), user (w), system (r)]
    pub fn init_user(&self, owner: &[u8; 32], username: &str) -> Result<Instruction, CodecError> {
        let ix = SocialInstruction::InitUser {
            username: pack_username(username),
        };
        let accounts = vec![
            AccountMeta::signer_writable(self.payer),
            AccountMeta::readonly(*owner),
            AccountMeta::writable(self.user_address(owner)?),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ];
        self.build(&ix, accounts)
    }

    /// Overwrite `owner`'s record. The username is packed with [`pack_username`].
    ///
    /// accounts = [payer (s,w), owner (r), user (w)]
    pub fn update_user(
        &self,
        owner: &[u8; 32],
        username: &str,
        posts_created: u64,
        likes_received: u64,
        likes_given: u64,
    ) -> Result<Instruction, CodecError> {
        let ix = SocialInstruction::UpdateUser {
            username: pack_username(username),
            posts_created,
            likes_received,
            likes_given,
        };
        let accounts = vec![
            AccountMeta::signer_writable(self.payer),
            AccountMeta::readonly(*owner),
            AccountMeta::writable(self.user_address(owner)?),
        ];
        self.build(&ix, accounts)
    }

    /// Fund `owner`'s escrow from the payer. Zero amounts are not checked here.
    ///
    /// accounts = [payer (s,w), owner (r), user (w), system (r)]
    pub fn deposit(&self, owner: &[u8; 32], lamports: u64) -> Result<Instruction, CodecError> {
        let accounts = vec![
            AccountMeta::signer_writable(self.payer),
            AccountMeta::readonly(*owner),
            AccountMeta::writable(self.user_address(owner)?),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ];
        self.build(&SocialInstruction::Deposit { lamports }, accounts)
    }

    /// Drain `lamports` from `owner`'s escrow.
    ///
    /// accounts = [payer (s,w), owner (w), user (w)]
    ///
    /// The owner is writable because it receives the lamports.
    pub fn withdraw(&self, owner: &[u8; 32], lamports: u64) -> Result<Instruction, CodecError> {
        let accounts = vec![
            AccountMeta::signer_writable(self.payer),
            AccountMeta::writable(*owner),
            AccountMeta::writable(self.user_address(owner)?),
        ];
        self.build(&SocialInstruction::Withdraw { lamports }, accounts)
    }

    /// accounts = [payer (s,w), owner (r), user (w), memo program (r)]
    pub fn post_chunk(&self, owner: &[u8; 32], chunk: &PostChunk) -> Result<Instruction, CodecError> {
        let ix = SocialInstruction::PostChunk {
            owner: *owner,
            is_head: chunk.is_head,
            chunk_id: chunk.chunk_id,
            chunk_total: chunk.chunk_total,
            content: chunk.payload.clone(),
        };
        let accounts = vec![
            AccountMeta::signer_writable(self.payer),
            AccountMeta::readonly(*owner),
            AccountMeta::writable(self.user_address(owner)?),
            AccountMeta::readonly(MEMO_PROGRAM_ID),
        ];
        self.build(&ix, accounts)
    }

    /// accounts = [payer (s,w), liker (r), liker user (w), post owner (r), post owner user (w)]
    pub fn like(
        &self,
        post_owner: &[u8; 32],
        post_seq: u64,
        liker: &[u8; 32],
        timestamp: u64,
    ) -> Result<Instruction, CodecError> {
        let ix = SocialInstruction::Like {
            post_owner: *post_owner,
            post_seq,
            liker: *liker,
            timestamp,
        };
        let accounts = vec![
            AccountMeta::signer_writable(self.payer),
            AccountMeta::readonly(*liker),
            AccountMeta::writable(self.user_address(liker)?),
            AccountMeta::readonly(*post_owner),
            AccountMeta::writable(self.user_address(post_owner)?),
        ];
        self.build(&ix, accounts)
    }

    fn build(&self, ix: &SocialInstruction, accounts: Vec<AccountMeta>) -> Result<Instruction, CodecError> {
        Ok(Instruction {
            program_id: self.program_id,
            accounts,
            data: ix.pack()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Little-endian reader
// ---------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::MalformedRecord(format!(
                "need {n} bytes at offset {}, only {} left",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::SOCIAL_PROGRAM_ID;

    const PAYER: [u8; 32] = [0xA0; 32];
    const OWNER: [u8; 32] = [0xB1; 32];
    const OTHER: [u8; 32] = [0xC2; 32];

    fn builder() -> InstructionBuilder {
        InstructionBuilder::new(SOCIAL_PROGRAM_ID, PAYER)
    }

    fn roundtrip(ix: SocialInstruction) {
        let data = ix.pack().unwrap();
        assert_eq!(data[0], ix.tag());
        assert_eq!(SocialInstruction::unpack(&data).unwrap(), ix);
    }

    // -- concrete layouts ---------------------------------------------------

    #[test]
    fn deposit_five_sol_is_nine_bytes() {
        let ix = builder().deposit(&OWNER, 5_000_000_000).unwrap();
        assert_eq!(ix.data.len(), 9);
        assert_eq!(ix.data[0], 4);
        assert_eq!(&ix.data[1..], &5_000_000_000u64.to_le_bytes());
    }

    #[test]
    fn init_user_layout() {
        let ix = builder().init_user(&OWNER, "alice").unwrap();
        assert_eq!(ix.data.len(), 1 + USER_RECORD_LEN);
        assert_eq!(ix.data[0], TAG_INIT_USER);
        assert_eq!(&ix.data[1..6], b"alice");
        assert!(ix.data[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn update_user_counter_offsets() {
        let ix = builder().update_user(&OWNER, "bob", 1, 2, 3).unwrap();
        assert_eq!(ix.data[0], TAG_UPDATE_USER);
        assert_eq!(&ix.data[33..41], &1u64.to_le_bytes());
        assert_eq!(&ix.data[41..49], &2u64.to_le_bytes());
        assert_eq!(&ix.data[49..57], &3u64.to_le_bytes());
    }

    #[test]
    fn post_chunk_layout() {
        let chunk = PostChunk {
            chunk_id: 2,
            chunk_total: 3,
            is_head: false,
            payload: b"Hello".to_vec(),
        };
        let ix = builder().post_chunk(&OWNER, &chunk).unwrap();
        let d = &ix.data;
        assert_eq!(d[0], TAG_POST_CHUNK);
        assert_eq!(&d[1..33], &OWNER);
        assert_eq!(d[33], 0);
        assert_eq!(&d[34..36], &2u16.to_le_bytes());
        assert_eq!(&d[36..38], &3u16.to_le_bytes());
        assert_eq!(&d[38..40], &5u16.to_le_bytes());
        assert_eq!(&d[40..], b"Hello");
    }

    #[test]
    fn like_layout() {
        let ix = builder().like(&OWNER, 7, &OTHER, 1_700_000_000).unwrap();
        let d = &ix.data;
        assert_eq!(d.len(), 81);
        assert_eq!(d[0], TAG_LIKE);
        assert_eq!(&d[1..33], &OWNER);
        assert_eq!(&d[33..41], &7u64.to_le_bytes());
        assert_eq!(&d[41..73], &OTHER);
        assert_eq!(&d[73..81], &1_700_000_000u64.to_le_bytes());
    }

    // -- account metas ------------------------------------------------------

    #[test]
    fn init_user_accounts() {
        let ix = builder().init_user(&OWNER, "alice").unwrap();
        let user = user_address(&OWNER, &SOCIAL_PROGRAM_ID).unwrap();
        assert_eq!(ix.program_id, SOCIAL_PROGRAM_ID);
        assert_eq!(
            ix.accounts,
            vec![
                AccountMeta::signer_writable(PAYER),
                AccountMeta::readonly(OWNER),
                AccountMeta::writable(user),
                AccountMeta::readonly(SYSTEM_PROGRAM_ID),
            ]
        );
    }

    #[test]
    fn update_user_has_no_system_program() {
        let ix = builder().update_user(&OWNER, "alice", 0, 0, 0).unwrap();
        assert_eq!(ix.accounts.len(), 3);
    }

    #[test]
    fn withdraw_marks_owner_writable() {
        let ix = builder().withdraw(&OWNER, 10).unwrap();
        assert_eq!(ix.accounts.len(), 3);
        assert_eq!(ix.accounts[1], AccountMeta::writable(OWNER));
    }

    #[test]
    fn deposit_keeps_owner_readonly() {
        let ix = builder().deposit(&OWNER, 10).unwrap();
        assert_eq!(ix.accounts[1], AccountMeta::readonly(OWNER));
        assert_eq!(ix.accounts[3], AccountMeta::readonly(SYSTEM_PROGRAM_ID));
    }

    #[test]
    fn post_chunk_references_memo_program() {
        let chunk = PostChunk {
            chunk_id: 1,
            chunk_total: 1,
            is_head: true,
            payload: vec![],
        };
        let ix = builder().post_chunk(&OWNER, &chunk).unwrap();
        assert_eq!(ix.accounts[3], AccountMeta::readonly(MEMO_PROGRAM_ID));
    }

    #[test]
    fn like_derives_both_user_addresses() {
        let ix = builder().like(&OWNER, 1, &OTHER, 0).unwrap();
        let liker_user = user_address(&OTHER, &SOCIAL_PROGRAM_ID).unwrap();
        let owner_user = user_address(&OWNER, &SOCIAL_PROGRAM_ID).unwrap();
        assert_eq!(
            ix.accounts,
            vec![
                AccountMeta::signer_writable(PAYER),
                AccountMeta::readonly(OTHER),
                AccountMeta::writable(liker_user),
                AccountMeta::readonly(OWNER),
                AccountMeta::writable(owner_user),
            ]
        );
    }

    // -- round trips --------------------------------------------------------

    #[test]
    fn roundtrip_every_kind_with_boundaries() {
        roundtrip(SocialInstruction::InitUser {
            username: pack_username(""),
        });
        roundtrip(SocialInstruction::InitUser {
            username: pack_username("abcdefghijklmnopqrstuvwxyz012345"),
        });
        roundtrip(SocialInstruction::UpdateUser {
            username: pack_username("carol"),
            posts_created: u64::MAX,
            likes_received: 0,
            likes_given: 42,
        });
        roundtrip(SocialInstruction::Deposit { lamports: 0 });
        roundtrip(SocialInstruction::Deposit { lamports: u64::MAX });
        roundtrip(SocialInstruction::Withdraw { lamports: 0 });
        roundtrip(SocialInstruction::Withdraw { lamports: u64::MAX });
        roundtrip(SocialInstruction::PostChunk {
            owner: OWNER,
            is_head: true,
            chunk_id: 1,
            chunk_total: 1,
            content: vec![],
        });
        roundtrip(SocialInstruction::PostChunk {
            owner: OWNER,
            is_head: false,
            chunk_id: 4,
            chunk_total: 4,
            content: vec![0xEE; 200],
        });
        roundtrip(SocialInstruction::Like {
            post_owner: OWNER,
            post_seq: u64::MAX,
            liker: OTHER,
            timestamp: 0,
        });
    }

    #[test]
    fn unpack_rejects_unknown_tag() {
        let err = SocialInstruction::unpack(&[9, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("unknown tag 9"));
    }

    #[test]
    fn unpack_rejects_empty_data() {
        assert!(SocialInstruction::unpack(&[]).is_err());
    }

    #[test]
    fn unpack_rejects_short_deposit() {
        assert!(SocialInstruction::unpack(&[TAG_DEPOSIT, 1, 2, 3]).is_err());
    }

    #[test]
    fn unpack_rejects_content_len_past_end() {
        let mut data = SocialInstruction::PostChunk {
            owner: OWNER,
            is_head: true,
            chunk_id: 1,
            chunk_total: 1,
            content: b"abc".to_vec(),
        }
        .pack()
        .unwrap();
        // Claim 200 bytes while only 3 follow.
        data[38..40].copy_from_slice(&200u16.to_le_bytes());
        let err = SocialInstruction::unpack(&data).unwrap_err();
        assert!(err.to_string().contains("exceeds remaining"));
    }

    #[test]
    fn unpack_rejects_trailing_bytes() {
        let mut data = SocialInstruction::Withdraw { lamports: 5 }.pack().unwrap();
        data.push(0);
        assert!(SocialInstruction::unpack(&data).is_err());
    }

    #[test]
    fn pack_rejects_oversized_chunk() {
        let ix = SocialInstruction::PostChunk {
            owner: OWNER,
            is_head: true,
            chunk_id: 1,
            chunk_total: 1,
            content: vec![0u8; u16::MAX as usize + 1],
        };
        assert!(matches!(ix.pack(), Err(CodecError::ContentTooLarge(_))));
    }

    // -- usernames ----------------------------------------------------------

    #[test]
    fn username_truncates_to_32_bytes() {
        let packed = pack_username(&"x".repeat(40));
        assert_eq!(unpack_username(&packed), "x".repeat(32));
    }

    #[test]
    fn username_truncation_respects_char_boundary() {
        // 31 ASCII bytes + a 2-byte char would straddle the limit.
        let name = format!("{}é", "a".repeat(31));
        let packed = pack_username(&name);
        assert_eq!(packed[31], 0);
        assert_eq!(unpack_username(&packed), "a".repeat(31));
    }

    #[test]
    fn username_exactly_32_bytes_has_no_nul() {
        let name = "abcdefghijklmnopqrstuvwxyz012345";
        let packed = pack_username(name);
        assert!(packed.iter().all(|&b| b != 0));
        assert_eq!(unpack_username(&packed), name);
    }

    // -- user record --------------------------------------------------------

    fn record(name: &[u8], posts: u64, recv: u64, given: u64) -> Vec<u8> {
        let mut raw = vec![0u8; USER_RECORD_LEN];
        raw[..name.len()].copy_from_slice(name);
        raw[32..40].copy_from_slice(&posts.to_le_bytes());
        raw[40..48].copy_from_slice(&recv.to_le_bytes());
        raw[48..56].copy_from_slice(&given.to_le_bytes());
        raw
    }

    #[test]
    fn decode_profile() {
        let profile = UserProfile::decode(&record(b"FLOCK4H", 3, 10, 2)).unwrap();
        assert_eq!(
            profile,
            UserProfile {
                username: "FLOCK4H".into(),
                posts_created: 3,
                likes_received: 10,
                likes_given: 2,
            }
        );
    }

    #[test]
    fn decode_profile_rejects_short_buffer() {
        let err = UserProfile::decode(&[0u8; USER_RECORD_LEN - 1]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedRecord(_)));
    }

    #[test]
    fn decode_profile_ignores_trailing_bytes() {
        let mut raw = record(b"dave", 1, 1, 1);
        raw.extend_from_slice(&[0xFF; 8]);
        assert_eq!(UserProfile::decode(&raw).unwrap().username, "dave");
    }

    #[test]
    fn decode_profile_replaces_invalid_utf8() {
        let raw = record(&[b'o', b'k', 0xFF], 0, 0, 0);
        assert_eq!(UserProfile::decode(&raw).unwrap().username, "ok\u{FFFD}");
    }

    #[test]
    fn decode_profile_with_max_counters() {
        let raw = record(b"", u64::MAX, u64::MAX, u64::MAX);
        let profile = UserProfile::decode(&raw).unwrap();
        assert_eq!(profile.username, "");
        assert_eq!(profile.posts_created, u64::MAX);
        assert_eq!(profile.likes_given, u64::MAX);
    }
}
