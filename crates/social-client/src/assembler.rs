//! Transaction submission and the post-submit visibility poll.

use std::time::Duration;

use serde::Serialize;
use social_codec::{bytes_to_address, compile_transaction, sign_transaction, with_compute_budget};
use social_codec::{ComputeBudget, Instruction};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::authority::Authority;
use crate::error::ClientError;
use crate::rpc::LedgerRpc;

/// Outcome of [`await_visible`]. Running out of time is not an error: the
/// transaction may still land later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    NotYetVisible,
}

/// Build, sign and send `instructions` as one atomic transaction.
///
/// The two compute-budget instructions are prepended. The wire is sent
/// exactly once; any failure on the way is reported as
/// [`ClientError::SubmissionFailed`] and nothing is retried.
pub async fn submit<R: LedgerRpc>(
    rpc: &R,
    authority: &Authority,
    instructions: &[Instruction],
    budget: ComputeBudget,
) -> Result<String, ClientError> {
    let blockhash = rpc
        .latest_blockhash()
        .await
        .map_err(ClientError::SubmissionFailed)?;

    let all = with_compute_budget(budget, instructions);
    let tx = compile_transaction(&all, &authority.pubkey(), &blockhash)?;
    let signed = sign_transaction(&tx, authority.secret())?;
    debug!(
        bytes = signed.wire.len(),
        accounts = tx.account_keys.len(),
        "signed transaction"
    );

    let signature = rpc
        .send_transaction(&signed.wire)
        .await
        .map_err(ClientError::SubmissionFailed)?;

    if signature != signed.signature_string() {
        warn!(
            reported = %signature,
            local = %signed.signature_string(),
            "node reported a different signature"
        );
    }
    info!(%signature, instructions = instructions.len(), "transaction submitted");
    Ok(signature)
}

/// Re-read `address` every `interval` until it exists or `deadline` passes.
///
/// The transaction has already been sent when this runs, so a failed read
/// counts as "not visible yet" and polling continues until the deadline.
pub async fn await_visible<R: LedgerRpc>(
    rpc: &R,
    address: &[u8; 32],
    deadline: Duration,
    interval: Duration,
) -> Visibility {
    let give_up = Instant::now() + deadline;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match rpc.get_account(address).await {
            Ok(Some(_)) => {
                debug!(attempts, "account visible");
                return Visibility::Visible;
            }
            Ok(None) => {}
            Err(e) => warn!(attempts, error = %e, "visibility read failed"),
        }

        let now = Instant::now();
        if now >= give_up {
            warn!(
                address = %bytes_to_address(address),
                attempts,
                "account not yet visible, giving up"
            );
            return Visibility::NotYetVisible;
        }
        sleep(interval.min(give_up - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use social_codec::transaction::compute_unit_limit_instruction;
    use social_codec::COMPUTE_BUDGET_PROGRAM_ID;

    use crate::error::RpcError;
    use crate::rpc::AccountData;

    /// Account becomes readable on the `visible_on`-th read.
    #[derive(Default)]
    struct StubRpc {
        sent: Mutex<Vec<Vec<u8>>>,
        reads: AtomicUsize,
        visible_on: Option<usize>,
        reject_send: bool,
        fail_reads: bool,
    }

    impl LedgerRpc for StubRpc {
        async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
            Ok([0xAB; 32])
        }

        async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
            self.sent.lock().unwrap().push(wire.to_vec());
            if self.reject_send {
                return Err(RpcError::Rpc {
                    code: -32002,
                    message: "simulation failed".into(),
                });
            }
            Ok(bs58::encode(&wire[1..65]).into_string())
        }

        async fn get_account(&self, _address: &[u8; 32]) -> Result<Option<AccountData>, RpcError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_reads {
                return Err(RpcError::InvalidResponse("node hiccup".into()));
            }
            Ok(match self.visible_on {
                Some(k) if n >= k => Some(AccountData {
                    lamports: 1,
                    data: vec![],
                }),
                _ => None,
            })
        }

        async fn get_transaction_logs(&self, _signature: &str) -> Result<Option<Vec<String>>, RpcError> {
            Ok(None)
        }
    }

    fn memo_ix() -> Instruction {
        Instruction {
            program_id: social_codec::MEMO_PROGRAM_ID,
            accounts: vec![],
            data: b"hi".to_vec(),
        }
    }

    #[tokio::test]
    async fn submit_sends_exactly_once_and_returns_signature() {
        let rpc = StubRpc::default();
        let authority = Authority::from_secret([5; 32]);

        let sig = submit(&rpc, &authority, &[memo_ix()], ComputeBudget::default())
            .await
            .unwrap();

        let sent = rpc.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sig, bs58::encode(&sent[0][1..65]).into_string());
    }

    #[tokio::test]
    async fn submit_places_budget_program_in_message() {
        let rpc = StubRpc::default();
        let authority = Authority::from_secret([5; 32]);
        submit(&rpc, &authority, &[memo_ix()], ComputeBudget::default())
            .await
            .unwrap();

        let wire = rpc.sent.lock().unwrap()[0].clone();
        let budget_data = compute_unit_limit_instruction(400_000).data;
        assert!(wire
            .windows(32)
            .any(|w| w == COMPUTE_BUDGET_PROGRAM_ID.as_slice()));
        assert!(wire.windows(budget_data.len()).any(|w| w == budget_data.as_slice()));
    }

    #[tokio::test]
    async fn rejected_send_is_submission_failed_without_retry() {
        let rpc = StubRpc {
            reject_send: true,
            ..Default::default()
        };
        let authority = Authority::from_secret([5; 32]);

        let err = submit(&rpc, &authority, &[memo_ix()], ComputeBudget::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::SubmissionFailed(_)));
        assert_eq!(rpc.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn becomes_visible_on_later_read() {
        let rpc = StubRpc {
            visible_on: Some(3),
            ..Default::default()
        };
        let visibility = await_visible(
            &rpc,
            &[1; 32],
            Duration::from_secs(6),
            Duration::from_millis(400),
        )
        .await;

        assert_eq!(visibility, Visibility::Visible);
        assert_eq!(rpc.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_yields_not_yet_visible() {
        let rpc = StubRpc::default();
        let started = Instant::now();
        let visibility = await_visible(
            &rpc,
            &[1; 32],
            Duration::from_millis(1_000),
            Duration::from_millis(400),
        )
        .await;

        assert_eq!(visibility, Visibility::NotYetVisible);
        assert!(started.elapsed() >= Duration::from_millis(1_000));
        // reads at 0, 400, 800, 1000
        assert_eq!(rpc.reads.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_reads_keep_polling_until_deadline() {
        let rpc = StubRpc {
            fail_reads: true,
            ..Default::default()
        };
        let visibility = await_visible(
            &rpc,
            &[1; 32],
            Duration::from_millis(1_000),
            Duration::from_millis(400),
        )
        .await;

        assert_eq!(visibility, Visibility::NotYetVisible);
        assert_eq!(rpc.reads.load(Ordering::SeqCst), 4);
    }
}
