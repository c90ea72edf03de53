//! Ledger RPC collaborator.
//!
//! [`LedgerRpc`] is the only way the client touches the network. The
//! production implementation speaks Solana JSON-RPC over HTTP; tests provide
//! an in-memory one.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use social_codec::bytes_to_address;
use tracing::debug;

use crate::config::Commitment;
use crate::error::RpcError;

/// An account as seen by the client: its balance and raw data bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub lamports: u64,
    pub data: Vec<u8>,
}

pub trait LedgerRpc {
    /// Latest blockhash, used as the recent blockhash of a new transaction.
    fn latest_blockhash(&self) -> impl Future<Output = Result<[u8; 32], RpcError>> + Send;

    /// Submit signed wire bytes once; returns the signature reported by the node.
    fn send_transaction(
        &self,
        wire: &[u8],
    ) -> impl Future<Output = Result<String, RpcError>> + Send;

    /// `None` when the account does not exist (yet).
    fn get_account(
        &self,
        address: &[u8; 32],
    ) -> impl Future<Output = Result<Option<AccountData>, RpcError>> + Send;

    /// Program log lines of a landed transaction; `None` when unknown.
    fn get_transaction_logs(
        &self,
        signature: &str,
    ) -> impl Future<Output = Result<Option<Vec<String>>, RpcError>> + Send;
}

// ---------------------------------------------------------------------------
// JSON-RPC over HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    lamports: u64,
    data: EncodedData,
}

/// Account data as nodes return it: `["<b64>", "base64"]` when an encoding
/// was requested, or a bare Base58 string from older nodes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EncodedData {
    Tagged(String, String),
    Legacy(String),
}

#[derive(Debug, Deserialize)]
struct TransactionResult {
    meta: Option<TransactionMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionMeta {
    log_messages: Option<Vec<String>>,
}

/// Normalize either account data shape into plain bytes.
fn decode_account_data(data: EncodedData) -> Result<Vec<u8>, RpcError> {
    match data {
        EncodedData::Tagged(body, encoding) => match encoding.as_str() {
            "base64" => BASE64
                .decode(body)
                .map_err(|e| RpcError::InvalidResponse(format!("account data: {e}"))),
            "base58" => bs58::decode(body)
                .into_vec()
                .map_err(|e| RpcError::InvalidResponse(format!("account data: {e}"))),
            other => Err(RpcError::InvalidResponse(format!(
                "unsupported account encoding: {other}"
            ))),
        },
        EncodedData::Legacy(body) => bs58::decode(body)
            .into_vec()
            .map_err(|e| RpcError::InvalidResponse(format!("account data: {e}"))),
    }
}

pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(
        url: impl Into<String>,
        commitment: Commitment,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()?;
        Ok(Self {
            url: url.into(),
            http,
            commitment,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One JSON-RPC round trip. A `null` result comes back as `None`.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "rpc request");

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result)
    }

    fn missing(method: &str) -> RpcError {
        RpcError::InvalidResponse(format!("{method}: missing result"))
    }
}

impl LedgerRpc for JsonRpcClient {
    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let params = json!([{ "commitment": self.commitment.as_str() }]);
        let response: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", params)
            .await?
            .ok_or_else(|| Self::missing("getLatestBlockhash"))?;

        let bytes = bs58::decode(&response.value.blockhash)
            .into_vec()
            .map_err(|e| RpcError::InvalidResponse(format!("blockhash: {e}")))?;
        bytes
            .try_into()
            .map_err(|_| RpcError::InvalidResponse("blockhash is not 32 bytes".into()))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let params = json!([
            BASE64.encode(wire),
            {
                "encoding": "base64",
                "preflightCommitment": self.commitment.as_str(),
            }
        ]);
        self.call("sendTransaction", params)
            .await?
            .ok_or_else(|| Self::missing("sendTransaction"))
    }

    async fn get_account(&self, address: &[u8; 32]) -> Result<Option<AccountData>, RpcError> {
        let params = json!([
            bytes_to_address(address),
            {
                "encoding": "base64",
                "commitment": self.commitment.as_str(),
            }
        ]);
        let response: WithContext<Option<AccountValue>> = self
            .call("getAccountInfo", params)
            .await?
            .ok_or_else(|| Self::missing("getAccountInfo"))?;

        response
            .value
            .map(|account| {
                Ok(AccountData {
                    lamports: account.lamports,
                    data: decode_account_data(account.data)?,
                })
            })
            .transpose()
    }

    async fn get_transaction_logs(&self, signature: &str) -> Result<Option<Vec<String>>, RpcError> {
        let params = json!([
            signature,
            {
                "encoding": "json",
                "commitment": self.commitment.for_transaction_lookup().as_str(),
                "maxSupportedTransactionVersion": 0,
            }
        ]);
        let tx: Option<TransactionResult> = self.call("getTransaction", params).await?;
        Ok(tx.map(|tx| {
            tx.meta
                .and_then(|meta| meta.log_messages)
                .unwrap_or_default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_account_data_is_decoded() {
        let value: AccountValue =
            serde_json::from_str(r#"{"lamports": 42, "data": ["AQID", "base64"]}"#).unwrap();
        assert_eq!(value.lamports, 42);
        assert_eq!(decode_account_data(value.data).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn legacy_base58_account_data_is_decoded() {
        let value: AccountValue =
            serde_json::from_str(r#"{"lamports": 1, "data": "Ldp"}"#).unwrap();
        assert_eq!(
            decode_account_data(value.data).unwrap(),
            bs58::decode("Ldp").into_vec().unwrap()
        );
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let data = EncodedData::Tagged("{}".into(), "jsonParsed".into());
        assert!(matches!(
            decode_account_data(data),
            Err(RpcError::InvalidResponse(_))
        ));
    }

    #[test]
    fn missing_account_parses_as_none() {
        let response: RpcResponse<WithContext<Option<AccountValue>>> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":5},"value":null}}"#,
        )
        .unwrap();
        assert!(response.result.unwrap().value.is_none());
    }

    #[test]
    fn rpc_error_body_is_parsed() {
        let response: RpcResponse<String> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32002,"message":"Transaction simulation failed"}}"#,
        )
        .unwrap();
        let err = response.error.unwrap();
        assert_eq!(err.code, -32002);
        assert!(response.result.is_none());
    }

    #[test]
    fn transaction_logs_are_extracted() {
        let response: RpcResponse<TransactionResult> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":4,"result":{"slot":9,"meta":{"err":null,"logMessages":["Program log: hi"]}}}"#,
        )
        .unwrap();
        let logs = response.result.unwrap().meta.unwrap().log_messages.unwrap();
        assert_eq!(logs, vec!["Program log: hi".to_string()]);
    }

    #[test]
    fn request_serializes_as_jsonrpc() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "getLatestBlockhash",
            params: json!([]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "getLatestBlockhash");
        assert_eq!(value["id"], 7);
    }
}
