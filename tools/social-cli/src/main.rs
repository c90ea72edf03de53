//! Command-line front end for the social ledger client.
//!
//! Configuration comes from `SOCIAL_*` environment variables; each
//! invocation runs one operation and prints its result as JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use social_client::{sol_to_lamports, Config, LedgerRpc, SocialClient};
use social_codec::address_to_bytes;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "social-cli")]
#[command(about = "Talk to the F4H social ledger program")]
#[command(version)]
struct Cli {
    /// RPC endpoint URL (overrides SOCIAL_RPC_URL)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the user record for an owner
    InitUser {
        username: String,
        /// Owner address; defaults to the payer
        #[arg(long)]
        owner: Option<String>,
    },
    /// Overwrite a user record
    UpdateUser {
        username: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long, default_value_t = 0)]
        posts_created: u64,
        #[arg(long, default_value_t = 0)]
        likes_received: u64,
        #[arg(long, default_value_t = 0)]
        likes_given: u64,
    },
    /// Publish a text post
    Post {
        text: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Like someone's post
    Like {
        post_owner: String,
        post_seq: u64,
        /// Liker address; defaults to the payer
        #[arg(long)]
        liker: Option<String>,
    },
    /// Move lamports into a user's escrow
    Deposit {
        #[command(flatten)]
        amount: Amount,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Move lamports out of a user's escrow
    Withdraw {
        #[command(flatten)]
        amount: Amount,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Reassemble a post from its transaction logs
    ReadPost { signature: String },
    /// Show a user record and its balance
    ReadUser {
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Amount {
    /// Amount in SOL
    #[arg(long)]
    sol: Option<f64>,

    /// Amount in lamports
    #[arg(long)]
    lamports: Option<u64>,
}

impl Amount {
    fn lamports(&self) -> Result<u64> {
        match (self.sol, self.lamports) {
            (_, Some(lamports)) => Ok(lamports),
            (Some(sol), None) => Ok(sol_to_lamports(sol)?),
            (None, None) => bail!("either --sol or --lamports is required"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(url) = cli.rpc_url {
        config.rpc_url = url;
    }
    info!(rpc = %config.rpc_url, payer = %config.payer.address(), "configuration loaded");

    let timeout = config.request_timeout;
    let client = SocialClient::connect(config)?;

    let output = tokio::time::timeout(timeout, run(&client, cli.command))
        .await
        .with_context(|| format!("request did not finish within {timeout:?}"))??;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");
    Ok(())
}

async fn run<R: LedgerRpc>(client: &SocialClient<R>, command: Command) -> Result<Value> {
    let payer = client.config().payer.pubkey();
    let resolve = |address: Option<String>| -> Result<[u8; 32]> {
        match address {
            Some(a) => address_to_bytes(&a).with_context(|| format!("bad address {a}")),
            None => Ok(payer),
        }
    };

    let output = match command {
        Command::InitUser { username, owner } => {
            let receipt = client.init_user(&resolve(owner)?, &username).await?;
            serde_json::to_value(receipt)?
        }
        Command::UpdateUser {
            username,
            owner,
            posts_created,
            likes_received,
            likes_given,
        } => {
            let signature = client
                .update_user(
                    &resolve(owner)?,
                    &username,
                    posts_created,
                    likes_received,
                    likes_given,
                )
                .await?;
            json!({ "signature": signature })
        }
        Command::Post { text, owner } => {
            let receipt = client.post(&resolve(owner)?, &text).await?;
            debug!(chunks = receipt.chunks.len(), "post submitted");
            serde_json::to_value(receipt)?
        }
        Command::Like {
            post_owner,
            post_seq,
            liker,
        } => {
            let post_owner = resolve(Some(post_owner))?;
            let signature = client.like(&post_owner, post_seq, &resolve(liker)?).await?;
            json!({ "signature": signature })
        }
        Command::Deposit { amount, owner } => {
            let receipt = client.deposit(&resolve(owner)?, amount.lamports()?).await?;
            serde_json::to_value(receipt)?
        }
        Command::Withdraw { amount, owner } => {
            let receipt = client.withdraw(&resolve(owner)?, amount.lamports()?).await?;
            serde_json::to_value(receipt)?
        }
        Command::ReadPost { signature } => serde_json::to_value(client.read_post(&signature).await?)?,
        Command::ReadUser { owner } => {
            let user = client.read_user(&resolve(owner)?).await?;
            let balance_sol = user.balance_sol();
            let mut value = serde_json::to_value(user)?;
            value["balance_sol"] = json!(balance_sol);
            value
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deposit_requires_exactly_one_amount() {
        assert!(Cli::try_parse_from(["social-cli", "deposit"]).is_err());
        assert!(
            Cli::try_parse_from(["social-cli", "deposit", "--sol", "1", "--lamports", "5"]).is_err()
        );

        let cli = Cli::try_parse_from(["social-cli", "deposit", "--sol", "0.5"]).unwrap();
        match cli.command {
            Command::Deposit { amount, owner } => {
                assert_eq!(amount.lamports().unwrap(), 500_000_000);
                assert!(owner.is_none());
            }
            _ => panic!("expected deposit"),
        }
    }

    #[test]
    fn like_takes_owner_and_sequence() {
        let cli = Cli::try_parse_from(["social-cli", "like", "11111111111111111111111111111111", "7"])
            .unwrap();
        assert!(matches!(cli.command, Command::Like { post_seq: 7, .. }));
    }
}
