//! Request-level operations against the social ledger program.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use social_codec::{bytes_to_address, reassemble, split, Instruction, InstructionBuilder};
use social_codec::{ReassembledPost, UserProfile};
use tracing::{debug, warn};

use crate::amount::lamports_to_sol;
use crate::assembler::{self, Visibility};
use crate::config::{Config, Operation};
use crate::error::ClientError;
use crate::rpc::{JsonRpcClient, LedgerRpc};

#[derive(Debug, Clone, Serialize)]
pub struct InitUserReceipt {
    pub signature: String,
    pub user_address: String,
    pub visibility: Visibility,
}

/// Summary of one chunk sent as part of a post.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkSummary {
    pub chunk_id: u16,
    pub chunk_total: u16,
    pub bytes: usize,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostReceipt {
    pub signature: String,
    pub owner: String,
    /// `posts_created + 1` at submit time. The program assigns the real
    /// sequence, so this is only a hint.
    pub predicted_sequence: u64,
    pub chunks: Vec<ChunkSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub signature: String,
    pub lamports: u64,
}

/// A user record together with the escrow balance it holds.
#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    pub address: String,
    #[serde(flatten)]
    pub profile: UserProfile,
    pub lamports: u64,
}

impl UserAccount {
    pub fn balance_sol(&self) -> f64 {
        lamports_to_sol(self.lamports)
    }
}

/// Single entry point for every operation.
///
/// Holds the immutable configuration, the RPC collaborator, and an
/// [`InstructionBuilder`] bound to the configured program and payer.
pub struct SocialClient<R> {
    config: Config,
    rpc: R,
    builder: InstructionBuilder,
}

impl SocialClient<JsonRpcClient> {
    /// Client backed by the JSON-RPC endpoint named in `config`.
    pub fn connect(config: Config) -> Result<Self, ClientError> {
        let rpc = JsonRpcClient::new(&config.rpc_url, config.commitment, config.request_timeout)?;
        Ok(Self::new(config, rpc))
    }
}

impl<R: LedgerRpc> SocialClient<R> {
    /// Client over any [`LedgerRpc`] implementation.
    pub fn new(config: Config, rpc: R) -> Self {
        let builder = InstructionBuilder::new(config.program_id, config.payer.pubkey());
        Self {
            config,
            rpc,
            builder,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying RPC collaborator.
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Derived address of the user record owned by `owner`.
    pub fn user_address(&self, owner: &[u8; 32]) -> Result<[u8; 32], ClientError> {
        Ok(self.builder.user_address(owner)?)
    }

    /// Create the user record for `owner`.
    ///
    /// After submission the new account is polled for within the configured
    /// visibility window. `NotYetVisible` is reported, not raised.
    pub async fn init_user(
        &self,
        owner: &[u8; 32],
        username: &str,
    ) -> Result<InitUserReceipt, ClientError> {
        self.ensure_enabled(Operation::InitUser)?;

        let user = self.user_address(owner)?;
        let ix = self.builder.init_user(owner, username)?;
        let signature = self.submit(&[ix]).await?;

        let visibility = assembler::await_visible(
            &self.rpc,
            &user,
            self.config.visibility_deadline,
            self.config.visibility_interval,
        )
        .await;

        Ok(InitUserReceipt {
            signature,
            user_address: bytes_to_address(&user),
            visibility,
        })
    }

    /// Overwrite the user record of `owner` with the given username and counters.
    ///
    /// Fails with `UserNotFound` before sending if the record does not exist.
    /// Returns the transaction signature.
    pub async fn update_user(
        &self,
        owner: &[u8; 32],
        username: &str,
        posts_created: u64,
        likes_received: u64,
        likes_given: u64,
    ) -> Result<String, ClientError> {
        self.ensure_enabled(Operation::UpdateUser)?;
        self.require_user(owner).await?;

        let ix = self
            .builder
            .update_user(owner, username, posts_created, likes_received, likes_given)?;
        self.submit(&[ix]).await
    }

    /// Publish `text` as one transaction carrying every chunk.
    pub async fn post(&self, owner: &[u8; 32], text: &str) -> Result<PostReceipt, ClientError> {
        self.ensure_enabled(Operation::Post)?;
        let user = self.require_user(owner).await?;
        let predicted_sequence = user.profile.posts_created.saturating_add(1);

        let chunks = split(text.as_bytes(), self.config.max_chunk_bytes)?;
        let mut instructions = Vec::with_capacity(chunks.len());
        let mut summaries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let ix = self.builder.post_chunk(owner, chunk)?;
            debug!(
                chunk_id = chunk.chunk_id,
                chunk_total = chunk.chunk_total,
                bytes = chunk.payload.len(),
                data_len = ix.data.len(),
                "encoded post chunk"
            );
            summaries.push(ChunkSummary {
                chunk_id: chunk.chunk_id,
                chunk_total: chunk.chunk_total,
                bytes: chunk.payload.len(),
                preview: String::from_utf8_lossy(&chunk.payload).into_owned(),
            });
            instructions.push(ix);
        }

        let signature = self.submit(&instructions).await?;
        Ok(PostReceipt {
            signature,
            owner: bytes_to_address(owner),
            predicted_sequence,
            chunks: summaries,
        })
    }

    /// Like post `post_seq` of `post_owner` on behalf of `liker`.
    pub async fn like(
        &self,
        post_owner: &[u8; 32],
        post_seq: u64,
        liker: &[u8; 32],
    ) -> Result<String, ClientError> {
        self.ensure_enabled(Operation::Like)?;
        self.require_user(liker).await?;
        self.require_user(post_owner).await?;

        let ix = self
            .builder
            .like(post_owner, post_seq, liker, unix_timestamp())?;
        self.submit(&[ix]).await
    }

    /// Move `lamports` from the payer into the escrow held by `owner`'s user record.
    ///
    /// Zero amounts are rejected locally, as is a missing user record.
    pub async fn deposit(&self, owner: &[u8; 32], lamports: u64) -> Result<TransferReceipt, ClientError> {
        self.ensure_enabled(Operation::Deposit)?;
        ensure_positive(lamports)?;
        self.require_user(owner).await?;

        let ix = self.builder.deposit(owner, lamports)?;
        let signature = self.submit(&[ix]).await?;
        Ok(TransferReceipt {
            signature,
            lamports,
        })
    }

    /// Move `lamports` out of `owner`'s escrow back to the owner.
    ///
    /// Zero amounts are rejected locally. The program enforces the balance.
    pub async fn withdraw(&self, owner: &[u8; 32], lamports: u64) -> Result<TransferReceipt, ClientError> {
        self.ensure_enabled(Operation::Withdraw)?;
        ensure_positive(lamports)?;
        self.require_user(owner).await?;

        let ix = self.builder.withdraw(owner, lamports)?;
        let signature = self.submit(&[ix]).await?;
        Ok(TransferReceipt {
            signature,
            lamports,
        })
    }

    /// Rebuild a post from the memo logs of the transaction `signature`.
    pub async fn read_post(&self, signature: &str) -> Result<ReassembledPost, ClientError> {
        self.ensure_enabled(Operation::ReadPost)?;

        let logs = self
            .rpc
            .get_transaction_logs(signature)
            .await?
            .ok_or_else(|| ClientError::TransactionNotFound(signature.to_string()))?;

        let post = reassemble(logs.as_slice())?;
        if !post.is_complete() {
            warn!(
                signature,
                found = post.chunks_found,
                total = post.chunk_total,
                "post is missing chunks"
            );
        }
        Ok(post)
    }

    /// Fetch and decode the user record of `owner` with its lamport balance.
    pub async fn read_user(&self, owner: &[u8; 32]) -> Result<UserAccount, ClientError> {
        self.ensure_enabled(Operation::ReadUser)?;
        self.require_user(owner).await
    }

    fn ensure_enabled(&self, op: Operation) -> Result<(), ClientError> {
        if self.config.operations.contains(op) {
            Ok(())
        } else {
            Err(ClientError::OperationDisabled(op))
        }
    }

    async fn require_user(&self, owner: &[u8; 32]) -> Result<UserAccount, ClientError> {
        let address = self.user_address(owner)?;
        let account = self
            .rpc
            .get_account(&address)
            .await?
            .ok_or_else(|| ClientError::UserNotFound(bytes_to_address(owner)))?;

        Ok(UserAccount {
            address: bytes_to_address(&address),
            profile: UserProfile::decode(&account.data)?,
            lamports: account.lamports,
        })
    }

    async fn submit(&self, instructions: &[Instruction]) -> Result<String, ClientError> {
        assembler::submit(&self.rpc, &self.config.payer, instructions, self.config.budget).await
    }
}

fn ensure_positive(lamports: u64) -> Result<(), ClientError> {
    if lamports == 0 {
        return Err(ClientError::InvalidAmount("amount must be greater than zero".into()));
    }
    Ok(())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
