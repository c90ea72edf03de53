//! Client configuration, loaded once at startup.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use social_codec::{address_to_bytes, ComputeBudget, SOCIAL_PROGRAM_ID};

use crate::authority::Authority;
use crate::error::ClientError;

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 200;

/// Ledger commitment level used for reads and preflight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// `getTransaction` rejects `processed`, so lookups use at least `confirmed`.
    pub fn for_transaction_lookup(self) -> Commitment {
        match self {
            Commitment::Processed => Commitment::Confirmed,
            other => other,
        }
    }
}

impl FromStr for Commitment {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(ClientError::Config(format!("unknown commitment: {other}"))),
        }
    }
}

/// Request-level operations exposed by [`crate::SocialClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    InitUser,
    UpdateUser,
    Post,
    Like,
    Deposit,
    Withdraw,
    ReadPost,
    ReadUser,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::InitUser,
        Operation::UpdateUser,
        Operation::Post,
        Operation::Like,
        Operation::Deposit,
        Operation::Withdraw,
        Operation::ReadPost,
        Operation::ReadUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::InitUser => "init-user",
            Operation::UpdateUser => "update-user",
            Operation::Post => "post",
            Operation::Like => "like",
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::ReadPost => "read-post",
            Operation::ReadUser => "read-user",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ClientError;

    /// Accepts both `init-user` and `init_user` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| ClientError::Config(format!("unknown operation: {s}")))
    }
}

/// The subset of operations this process is allowed to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledOperations(BTreeSet<Operation>);

impl EnabledOperations {
    pub fn all() -> Self {
        Self(Operation::ALL.into_iter().collect())
    }

    pub fn only(ops: impl IntoIterator<Item = Operation>) -> Self {
        Self(ops.into_iter().collect())
    }

    pub fn contains(&self, op: Operation) -> bool {
        self.0.contains(&op)
    }

    /// Parse a comma-separated list such as `"post,read-post"`.
    pub fn parse(list: &str) -> Result<Self, ClientError> {
        let ops = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Operation::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if ops.is_empty() {
            return Err(ClientError::Config("no operations enabled".into()));
        }
        Ok(Self(ops))
    }
}

impl Default for EnabledOperations {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug)]
pub struct Config {
    /// JSON-RPC endpoint
    pub rpc_url: String,

    pub commitment: Commitment,

    /// Social ledger program
    pub program_id: [u8; 32],

    /// Fee payer and signer of every transaction
    pub payer: Authority,

    pub budget: ComputeBudget,

    /// Upper bound on a single post chunk's payload
    pub max_chunk_bytes: usize,

    /// How long `init_user` waits for the new account to become readable
    pub visibility_deadline: Duration,

    pub visibility_interval: Duration,

    /// Per-request bound applied by the HTTP client and the CLI
    pub request_timeout: Duration,

    pub operations: EnabledOperations,
}

impl Config {
    /// Defaults for everything except the endpoint and the payer.
    pub fn new(rpc_url: impl Into<String>, payer: Authority) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            commitment: Commitment::default(),
            program_id: SOCIAL_PROGRAM_ID,
            payer,
            budget: ComputeBudget::default(),
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            visibility_deadline: Duration::from_millis(6_000),
            visibility_interval: Duration::from_millis(400),
            request_timeout: Duration::from_millis(30_000),
            operations: EnabledOperations::all(),
        }
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let payer = match (
            lookup("SOCIAL_PAYER_KEYPAIR"),
            lookup("SOCIAL_PAYER_KEYPAIR_PATH"),
        ) {
            (Some(encoded), _) => Authority::from_base58(&encoded)?,
            (None, Some(path)) => {
                let path = shellexpand::tilde(&path).to_string();
                Authority::from_json_file(Path::new(&path))?
            }
            (None, None) => {
                return Err(ClientError::Config(
                    "SOCIAL_PAYER_KEYPAIR or SOCIAL_PAYER_KEYPAIR_PATH must be set".into(),
                ))
            }
        };

        let rpc_url = lookup("SOCIAL_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let mut config = Config::new(rpc_url, payer);

        if let Some(id) = lookup("SOCIAL_PROGRAM_ID") {
            config.program_id = address_to_bytes(id.trim())
                .map_err(|e| ClientError::Config(format!("SOCIAL_PROGRAM_ID: {e}")))?;
        }
        if let Some(commitment) = lookup("SOCIAL_COMMITMENT") {
            config.commitment = commitment.parse()?;
        }
        if let Some(limit) = parse_var(&lookup, "SOCIAL_CU_LIMIT")? {
            config.budget.compute_unit_limit = limit;
        }
        if let Some(price) = parse_var(&lookup, "SOCIAL_CU_PRICE")? {
            config.budget.compute_unit_price = price;
        }
        if let Some(max) = parse_var(&lookup, "SOCIAL_MAX_CHUNK_BYTES")? {
            config.max_chunk_bytes = max;
        }
        if let Some(ms) = parse_var(&lookup, "SOCIAL_VISIBILITY_DEADLINE_MS")? {
            config.visibility_deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "SOCIAL_VISIBILITY_INTERVAL_MS")? {
            config.visibility_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "SOCIAL_REQUEST_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(list) = lookup("SOCIAL_OPERATIONS") {
            config.operations = EnabledOperations::parse(&list)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.max_chunk_bytes == 0 || self.max_chunk_bytes > u16::MAX as usize {
            return Err(ClientError::Config(format!(
                "max_chunk_bytes must be within 1..={}, got {}",
                u16::MAX,
                self.max_chunk_bytes
            )));
        }
        if self.visibility_interval.is_zero() {
            return Err(ClientError::Config("visibility_interval must be non-zero".into()));
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ClientError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| ClientError::Config(format!("invalid {key}: {e}")))
        })
        .transpose()
}
