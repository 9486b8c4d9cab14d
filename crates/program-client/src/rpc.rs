//! The node boundary.
//!
//! [`RpcAdapter`] is the whole contract the rest of the crate relies on, so
//! tests can substitute an in-memory node. [`HttpRpcClient`] implements it as
//! JSON-RPC 2.0 over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use chain_sol::{Address, Hash, Signature, SignedTransaction};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{ClientConfig, Commitment};
use crate::error::ClientError;

/// Status of a submitted transaction as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the transaction is rooted.
    pub confirmations: Option<u64>,
    /// On-chain execution error, if the transaction failed.
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// Seen by the node with a confirmation count attached.
    pub fn is_confirmed(&self) -> bool {
        self.confirmations.is_some()
    }
}

#[async_trait]
pub trait RpcAdapter: Send + Sync {
    /// Recent checkpoint hash to anchor a new transaction.
    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError>;

    async fn get_slot(&self) -> Result<u64, ClientError>;

    /// Raw account data, or `None` if the account does not exist.
    async fn get_account_info(&self, address: &Address) -> Result<Option<Vec<u8>>, ClientError>;

    /// Submit a signed transaction. A node rejection is a
    /// [`ClientError::SubmissionFailure`].
    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<Signature, ClientError>;

    /// One entry per requested signature, `None` for unknown ones.
    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, ClientError>;

    async fn get_balance(&self, address: &Address) -> Result<u64, ClientError>;

    async fn request_airdrop(&self, address: &Address, lamports: u64)
        -> Result<Signature, ClientError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<NodeError>,
}

#[derive(Debug, Deserialize)]
struct NodeError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl NodeError {
    fn logs(&self) -> Vec<String> {
        self.data
            .as_ref()
            .and_then(|d| d.get("logs"))
            .and_then(Value::as_array)
            .map(|logs| {
                logs.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
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
    /// `[payload, encoding]`
    data: (String, String),
}

/// JSON-RPC client for a single node endpoint.
#[derive(Debug)]
pub struct HttpRpcClient {
    http: reqwest::Client,
    endpoint: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ClientError> {
        let defaults = ClientConfig::default();
        Self::with_options(endpoint, defaults.request_timeout(), defaults.commitment)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::with_options(
            config.rpc_url.clone(),
            config.request_timeout(),
            config.commitment,
        )
    }

    pub fn with_options(
        endpoint: impl Into<String>,
        request_timeout: Duration,
        commitment: Commitment,
    ) -> Result<Self, ClientError> {
        let endpoint = endpoint.into();
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Transport {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        Ok(HttpRpcClient {
            http,
            endpoint,
            commitment,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.commitment.as_str() })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, endpoint = %self.endpoint, "rpc request");

        let transport = |message: String| ClientError::Transport {
            endpoint: self.endpoint.clone(),
            message,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport(e.to_string()))?;

        let envelope: Envelope = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(transport(format!("http status {status}")));
            }
            Err(e) => {
                return Err(ClientError::InvalidResponse(format!("{method}: {e}")));
            }
        };

        if let Some(error) = envelope.error {
            warn!(method, code = error.code, message = %error.message, "rpc error");
            return Err(if method == "sendTransaction" {
                ClientError::SubmissionFailure {
                    logs: error.logs(),
                    message: error.message,
                }
            } else {
                ClientError::Rpc {
                    code: error.code,
                    message: error.message,
                }
            });
        }

        let result = envelope
            .result
            .ok_or_else(|| ClientError::InvalidResponse(format!("{method}: missing result")))?;

        serde_json::from_value(result)
            .map_err(|e| ClientError::InvalidResponse(format!("{method}: {e}")))
    }
}

fn parse_signature(raw: &str) -> Result<Signature, ClientError> {
    raw.parse()
        .map_err(|e| ClientError::InvalidResponse(format!("bad signature {raw:?}: {e}")))
}

#[async_trait]
impl RpcAdapter for HttpRpcClient {
    async fn get_latest_blockhash(&self) -> Result<Hash, ClientError> {
        let response: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([self.commitment_config()]))
            .await?;
        response
            .value
            .blockhash
            .parse()
            .map_err(|e| ClientError::InvalidResponse(format!("bad blockhash: {e}")))
    }

    async fn get_slot(&self) -> Result<u64, ClientError> {
        self.call("getSlot", json!([self.commitment_config()])).await
    }

    async fn get_account_info(&self, address: &Address) -> Result<Option<Vec<u8>>, ClientError> {
        let response: WithContext<Option<AccountValue>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.commitment.as_str() }
                ]),
            )
            .await?;

        let Some(account) = response.value else {
            debug!(%address, "account not found");
            return Ok(None);
        };

        let (payload, encoding) = account.data;
        if encoding != "base64" {
            return Err(ClientError::InvalidResponse(format!(
                "account data in unexpected encoding {encoding:?}"
            )));
        }

        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map(Some)
            .map_err(|e| ClientError::InvalidResponse(format!("account data: {e}")))
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> Result<Signature, ClientError> {
        let signature: String = self
            .call(
                "sendTransaction",
                json!([
                    tx.to_base64()?,
                    {
                        "encoding": "base64",
                        "skipPreflight": false,
                        "preflightCommitment": self.commitment.as_str(),
                    }
                ]),
            )
            .await?;
        parse_signature(&signature)
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, ClientError> {
        let encoded: Vec<String> = signatures.iter().map(ToString::to_string).collect();
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([encoded, { "searchTransactionHistory": false }]),
            )
            .await?;

        if response.value.len() != signatures.len() {
            return Err(ClientError::InvalidResponse(format!(
                "asked for {} statuses, got {}",
                signatures.len(),
                response.value.len()
            )));
        }
        Ok(response.value)
    }

    async fn get_balance(&self, address: &Address) -> Result<u64, ClientError> {
        let response: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), self.commitment_config()]),
            )
            .await?;
        Ok(response.value)
    }

    async fn request_airdrop(
        &self,
        address: &Address,
        lamports: u64,
    ) -> Result<Signature, ClientError> {
        let signature: String = self
            .call(
                "requestAirdrop",
                json!([address.to_string(), lamports, self.commitment_config()]),
            )
            .await?;
        parse_signature(&signature)
    }
}

#[cfg(test)]
mod tests {
    use chain_sol::{compose, AccountMeta, Instruction, Keypair};
    use mockito::{Matcher, Server};

    use super::*;

    const SIG: &str =
        "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";

    fn rpc_result(result: Value) -> String {
        json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string()
    }

    async fn mock_method(server: &mut Server, method: &str, body: String) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": method })))
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn get_slot_reads_result() {
        let mut server = Server::new_async().await;
        let mock = mock_method(&mut server, "getSlot", rpc_result(json!(4242))).await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        assert_eq!(client.get_slot().await.unwrap(), 4242);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn latest_blockhash_is_parsed() {
        let mut server = Server::new_async().await;
        let blockhash = "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N";
        mock_method(
            &mut server,
            "getLatestBlockhash",
            rpc_result(json!({
                "context": { "slot": 1 },
                "value": { "blockhash": blockhash, "lastValidBlockHeight": 200 }
            })),
        )
        .await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        assert_eq!(
            client.get_latest_blockhash().await.unwrap().to_string(),
            blockhash
        );
    }

    #[tokio::test]
    async fn account_info_decodes_base64() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "getAccountInfo",
                "params": ["11111111111111111111111111111111", { "encoding": "base64" }]
            })))
            .with_body(rpc_result(json!({
                "context": { "slot": 1 },
                "value": {
                    "data": ["AQIDBA==", "base64"],
                    "executable": false,
                    "lamports": 1_000,
                    "owner": "11111111111111111111111111111111",
                    "rentEpoch": 0
                }
            })))
            .create_async()
            .await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        let data = client
            .get_account_info(&chain_sol::SYSTEM_PROGRAM_ID)
            .await
            .unwrap();
        assert_eq!(data, Some(vec![1, 2, 3, 4]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_account_is_none() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "getAccountInfo",
            rpc_result(json!({ "context": { "slot": 1 }, "value": null })),
        )
        .await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        assert_eq!(
            client.get_account_info(&Address([9; 32])).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn rejected_transaction_keeps_node_logs() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "sendTransaction",
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {
                    "code": -32002,
                    "message": "Transaction simulation failed: Error processing Instruction 0: custom program error: 0xbc4",
                    "data": {
                        "err": { "InstructionError": [0, { "Custom": 3012 }] },
                        "logs": [
                            "Program log: AnchorError caused by account: counter. Error Code: AccountNotInitialized."
                        ]
                    }
                }
            })
            .to_string(),
        )
        .await;

        let payer = Keypair::from_seed(&[1; 32]);
        let tx = compose(
            &payer.pubkey(),
            &[Instruction {
                program_id: Address([2; 32]),
                accounts: vec![AccountMeta::signer(payer.pubkey())],
                data: vec![],
            }],
            Hash([3; 32]),
            &[&payer],
        )
        .unwrap();

        let client = HttpRpcClient::new(server.url()).unwrap();
        let err = client.send_transaction(&tx).await.unwrap_err();

        assert!(matches!(err, ClientError::SubmissionFailure { .. }));
        assert!(err.mentions("AccountNotInitialized"));
        assert_eq!(err.custom_error_code(), Some(3012));
    }

    #[tokio::test]
    async fn send_transaction_posts_base64_wire_bytes() {
        let payer = Keypair::from_seed(&[4; 32]);
        let tx = compose(
            &payer.pubkey(),
            &[Instruction {
                program_id: Address([5; 32]),
                accounts: vec![],
                data: vec![1],
            }],
            Hash([6; 32]),
            &[&payer],
        )
        .unwrap();

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "sendTransaction",
                "params": [tx.to_base64().unwrap(), { "encoding": "base64", "skipPreflight": false }]
            })))
            .with_body(rpc_result(json!(SIG)))
            .create_async()
            .await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        assert_eq!(client.send_transaction(&tx).await.unwrap().to_string(), SIG);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn signature_statuses_keep_positions() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "getSignatureStatuses",
            rpc_result(json!({
                "context": { "slot": 10 },
                "value": [
                    null,
                    { "slot": 9, "confirmations": 1, "err": null, "confirmationStatus": "confirmed" },
                    { "slot": 5, "confirmations": null, "err": null, "confirmationStatus": "finalized" }
                ]
            })),
        )
        .await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        let sig: Signature = SIG.parse().unwrap();
        let statuses = client
            .get_signature_statuses(&[sig, sig, sig])
            .await
            .unwrap();

        assert_eq!(statuses[0], None);
        let confirmed = statuses[1].as_ref().unwrap();
        assert!(confirmed.is_confirmed());
        assert_eq!(confirmed.confirmation_status.as_deref(), Some("confirmed"));
        assert!(!statuses[2].as_ref().unwrap().is_confirmed());
    }

    #[tokio::test]
    async fn status_count_mismatch_is_invalid() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "getSignatureStatuses",
            rpc_result(json!({ "context": { "slot": 10 }, "value": [] })),
        )
        .await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        let err = client
            .get_signature_statuses(&[SIG.parse().unwrap()])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn balance_and_airdrop() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "getBalance",
            rpc_result(json!({ "context": { "slot": 1 }, "value": 2_000_000_000u64 })),
        )
        .await;
        mock_method(&mut server, "requestAirdrop", rpc_result(json!(SIG))).await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        let address = Address([7; 32]);
        assert_eq!(client.get_balance(&address).await.unwrap(), 2_000_000_000);
        assert_eq!(
            client
                .request_airdrop(&address, 1_000_000_000)
                .await
                .unwrap()
                .to_string(),
            SIG
        );
    }

    #[tokio::test]
    async fn node_errors_are_structured() {
        let mut server = Server::new_async().await;
        mock_method(
            &mut server,
            "getSlot",
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32601, "message": "Method not found" }
            })
            .to_string(),
        )
        .await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        match client.get_slot().await.unwrap_err() {
            ClientError::Rpc { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("expected Rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_failure_is_transport_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = HttpRpcClient::new(server.url()).unwrap();
        let err = client.get_slot().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn unreachable_node_is_transport_error() {
        // Nothing listens on port 9 locally.
        let client = HttpRpcClient::with_options(
            "http://127.0.0.1:9",
            Duration::from_secs(2),
            Commitment::Confirmed,
        )
        .unwrap();
        let err = client.get_slot().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }
}
