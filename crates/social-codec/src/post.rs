//! Chunked posts and their reconstruction from memo log lines.
//!
//! A post is split into bounded chunks, each encoded as one post-chunk
//! instruction. All chunks of a post travel in one transaction. While
//! executing them the program writes one memo per chunk, which shows up in
//! the transaction logs as a quoted token:
//!
//! ```text
//! F4HPOST|1|<owner>|<sequence>|<chunk_id>|<chunk_total>|<hex payload>
//! ```

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CodecError;

pub const MEMO_MARKER: &str = "F4HPOST";
pub const MEMO_VERSION: &str = "1";

/// One bounded fragment of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChunk {
    /// 1-based position.
    pub chunk_id: u16,
    pub chunk_total: u16,
    pub is_head: bool,
    pub payload: Vec<u8>,
}

/// Split `content` into chunks of at most `max_chunk_bytes`.
///
/// Empty content still produces a single, empty head chunk.
pub fn split(content: &[u8], max_chunk_bytes: usize) -> Result<Vec<PostChunk>, CodecError> {
    if max_chunk_bytes == 0 || max_chunk_bytes > u16::MAX as usize {
        return Err(CodecError::InvalidChunkSize(max_chunk_bytes));
    }

    let parts: Vec<&[u8]> = if content.is_empty() {
        vec![content]
    } else {
        content.chunks(max_chunk_bytes).collect()
    };

    let chunk_total = u16::try_from(parts.len()).map_err(|_| {
        CodecError::ContentTooLarge(format!(
            "{} bytes needs {} chunks, limit is {}",
            content.len(),
            parts.len(),
            u16::MAX
        ))
    })?;

    Ok(parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            // Fits: the count was checked against u16 above.
            let chunk_id = (i + 1) as u16;
            PostChunk {
                chunk_id,
                chunk_total,
                is_head: chunk_id == 1,
                payload: part.to_vec(),
            }
        })
        .collect())
}

/// Render the memo token the program emits for `chunk`.
pub fn format_memo(owner_ref: &str, sequence: u64, chunk: &PostChunk) -> String {
    format!(
        "{MEMO_MARKER}|{MEMO_VERSION}|{owner_ref}|{sequence}|{}|{}|{}",
        chunk.chunk_id,
        chunk.chunk_total,
        hex::encode(&chunk.payload)
    )
}

// ---------------------------------------------------------------------------
// Reassembly
// ---------------------------------------------------------------------------

/// One parsed memo record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoRecord {
    pub owner_ref: String,
    pub sequence: u64,
    pub chunk_id: u16,
    pub chunk_total: u16,
    pub payload: Vec<u8>,
}

/// Reconstructed post body.
///
/// `Hex` is returned when the concatenated bytes are not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "encoding", content = "body", rename_all = "lowercase")]
pub enum PostBody {
    Utf8(String),
    Hex(String),
}

impl PostBody {
    pub fn as_str(&self) -> &str {
        match self {
            PostBody::Utf8(s) | PostBody::Hex(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PostBody::Hex(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReassembledPost {
    pub owner_ref: String,
    pub sequence: u64,
    pub chunk_total: u16,
    pub chunks_found: usize,
    pub body: PostBody,
}

impl ReassembledPost {
    pub fn is_complete(&self) -> bool {
        self.chunks_found == self.chunk_total as usize
    }
}

/// Parse the first qualifying memo token in `line`.
///
/// Each double-quoted field of the line is tried in turn; anything that is
/// not a well-formed `F4HPOST|1|...` token is skipped.
pub fn parse_memo_line(line: &str) -> Option<MemoRecord> {
    // Odd-indexed pieces are the quoted fields.
    line.split('"')
        .skip(1)
        .step_by(2)
        .find_map(parse_memo_token)
}

fn parse_memo_token(token: &str) -> Option<MemoRecord> {
    let parts: Vec<&str> = token.split('|').collect();
    let [marker, version, owner, seq, id, total, payload] = parts.as_slice() else {
        return None;
    };
    if *marker != MEMO_MARKER || *version != MEMO_VERSION {
        return None;
    }

    Some(MemoRecord {
        owner_ref: (*owner).to_string(),
        sequence: seq.parse().ok()?,
        chunk_id: id.parse().ok()?,
        chunk_total: total.parse().ok()?,
        payload: hex::decode(payload).ok()?,
    })
}

/// Rebuild a post from transaction log lines.
///
/// Unrelated lines are ignored and chunks are ordered by `chunk_id`, not by
/// log position. All qualifying lines must describe the same post and carry
/// a chunk id within `1..=chunk_total`.
pub fn reassemble<S: AsRef<str>>(lines: &[S]) -> Result<ReassembledPost, CodecError> {
    let mut header: Option<(String, u64, u16)> = None;
    let mut chunks: BTreeMap<u16, Vec<u8>> = BTreeMap::new();

    for record in lines.iter().filter_map(|l| parse_memo_line(l.as_ref())) {
        if record.chunk_id == 0 || record.chunk_id > record.chunk_total {
            return Err(CodecError::InconsistentPost(format!(
                "chunk id {} outside 1..={}",
                record.chunk_id, record.chunk_total
            )));
        }

        let key = (record.owner_ref, record.sequence, record.chunk_total);
        if let Some(expected) = &header {
            if *expected != key {
                return Err(CodecError::InconsistentPost(format!(
                    "chunk {} belongs to ({}, {}, total {}), expected ({}, {}, total {})",
                    record.chunk_id, key.0, key.1, key.2, expected.0, expected.1, expected.2
                )));
            }
        } else {
            header = Some(key);
        }

        match chunks.entry(record.chunk_id) {
            Entry::Vacant(slot) => {
                slot.insert(record.payload);
            }
            Entry::Occupied(slot) if *slot.get() != record.payload => {
                return Err(CodecError::InconsistentPost(format!(
                    "chunk {} appears twice with different payloads",
                    record.chunk_id
                )));
            }
            Entry::Occupied(_) => {}
        }
    }

    let (owner_ref, sequence, chunk_total) = header.ok_or(CodecError::NoPostFound)?;

    let chunks_found = chunks.len();
    let bytes: Vec<u8> = chunks.into_values().flatten().collect();
    let body = match String::from_utf8(bytes) {
        Ok(text) => PostBody::Utf8(text),
        Err(e) => PostBody::Hex(hex::encode(e.as_bytes())),
    };

    Ok(ReassembledPost {
        owner_ref,
        sequence,
        chunk_total,
        chunks_found,
        body,
    })
}
