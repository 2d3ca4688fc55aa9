// SPDX-License-Identifier: Apache-2.0

use crate::resolver::{RegistryError, RegistryReader};
use crate::HoldersError;
use async_trait::async_trait;
use ens_clubs_model::{Identifier, OwnerAddress};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::instrument;

/// `ownerOf(uint256)`.
pub const OWNER_OF_SELECTOR: &str = "6352211e";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl RpcErrorBody {
    fn is_revert(&self) -> bool {
        let data = self
            .data
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        self.message.to_ascii_lowercase().contains("revert")
            || data.to_ascii_lowercase().contains("revert")
    }
}

/// Registrar reader over Ethereum JSON-RPC `eth_call`.
pub struct JsonRpcRegistry {
    client: reqwest::Client,
    rpc_url: String,
    contract: String,
    next_id: AtomicU64,
}

impl JsonRpcRegistry {
    pub fn new(rpc_url: &str, contract: &str, timeout: Duration) -> Result<Self, HoldersError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HoldersError::config(format!("rpc client build failed: {e}")))?;
        reqwest::Url::parse(rpc_url)
            .map_err(|e| HoldersError::config(format!("invalid rpc url `{rpc_url}`: {e}")))?;
        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            contract: contract.to_ascii_lowercase(),
            next_id: AtomicU64::new(1),
        })
    }

    fn call_body(&self, id: &Identifier) -> serde_json::Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": "eth_call",
            "params": [
                {
                    "to": self.contract,
                    "data": format!("0x{OWNER_OF_SELECTOR}{}", id.to_word_hex()),
                },
                "latest"
            ]
        })
    }
}

#[async_trait]
impl RegistryReader for JsonRpcRegistry {
    fn tier_tag(&self) -> &'static str {
        "json_rpc"
    }

    #[instrument(name = "registry_owner_of", skip(self, id), fields(id = %id))]
    async fn owner_of(&self, id: &Identifier) -> Result<OwnerAddress, RegistryError> {
        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&self.call_body(id))
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RegistryError::Transport(format!("rpc body read failed: {e}")))?;
        decode_reply(status, &body)
    }
}

/// Some providers send JSON-RPC errors (reverts included) with a 4xx/5xx
/// status, so the envelope is honoured whatever the status.
fn decode_reply(status: StatusCode, body: &str) -> Result<OwnerAddress, RegistryError> {
    let parsed = serde_json::from_str::<RpcResponse>(body);
    if !status.is_success() {
        return match parsed {
            Ok(reply) if reply.error.is_some() || reply.result.is_some() => {
                decode_owner_of(reply)
            }
            _ => Err(RegistryError::Transport(format!("rpc status {status}"))),
        };
    }
    let reply =
        parsed.map_err(|e| RegistryError::Transport(format!("rpc body parse failed: {e}")))?;
    decode_owner_of(reply)
}

fn decode_owner_of(body: RpcResponse) -> Result<OwnerAddress, RegistryError> {
    if let Some(err) = body.error {
        if err.is_revert() {
            return Err(RegistryError::Reverted(err.message));
        }
        return Err(RegistryError::Transport(format!(
            "rpc error {}: {}",
            err.code, err.message
        )));
    }
    let word = body.result.unwrap_or_default();
    let hex = word.trim().trim_start_matches("0x");
    if hex.is_empty() {
        return Err(RegistryError::Empty);
    }
    let owner = OwnerAddress::from_abi_word(hex)
        .map_err(|e| RegistryError::Transport(format!("rpc result malformed: {e}")))?;
    if owner.is_zero() {
        return Err(RegistryError::Empty);
    }
    Ok(owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<OwnerAddress, RegistryError> {
        decode_owner_of(serde_json::from_str(raw).expect("rpc json"))
    }

    #[test]
    fn address_word_decodes_to_lowercase_owner() {
        let owner = parse(
            r#"{"jsonrpc":"2.0","id":1,"result":"0x000000000000000000000000D8DA6BF26964AF9D7EED9E03E53415D37AA96045"}"#,
        )
        .expect("owner");
        assert_eq!(owner.as_str(), "0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
    }

    #[test]
    fn revert_errors_are_expiry() {
        let err = parse(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":3,"message":"execution reverted"}}"#,
        )
        .expect_err("revert");
        assert!(matches!(err, RegistryError::Reverted(_)));
    }

    #[test]
    fn other_errors_are_transport() {
        let err = parse(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"rate limited"}}"#)
            .expect_err("rate limit");
        assert!(matches!(err, RegistryError::Transport(_)));
    }

    #[test]
    fn revert_envelope_counts_even_on_error_status() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":3,"message":"execution reverted"}}"#;
        assert!(matches!(
            decode_reply(StatusCode::INTERNAL_SERVER_ERROR, body),
            Err(RegistryError::Reverted(_))
        ));
        assert!(matches!(
            decode_reply(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            Err(RegistryError::Transport(msg)) if msg.contains("502")
        ));
        assert!(matches!(
            decode_reply(StatusCode::OK, "not json"),
            Err(RegistryError::Transport(_))
        ));
    }

    #[test]
    fn empty_and_zero_results_carry_no_owner() {
        assert_eq!(
            parse(r#"{"jsonrpc":"2.0","id":1,"result":"0x"}"#),
            Err(RegistryError::Empty)
        );
        assert_eq!(
            parse(&format!(
                r#"{{"jsonrpc":"2.0","id":1,"result":"0x{}"}}"#,
                "0".repeat(64)
            )),
            Err(RegistryError::Empty)
        );
    }

    #[test]
    fn call_data_is_selector_plus_identifier_word() {
        let registry = JsonRpcRegistry::new(
            "http://127.0.0.1:8545",
            "0x57F1887A8BF19B14FC0DF6FD9B2ACC9AF147EA85",
            Duration::from_secs(1),
        )
        .expect("registry");
        let id = Identifier::parse("255").expect("id");
        let body = registry.call_body(&id);
        let data = body["params"][0]["data"].as_str().expect("data");
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x6352211e"));
        assert!(data.ends_with("ff"));
        assert_eq!(
            body["params"][0]["to"],
            "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85"
        );
        assert_eq!(body["params"][1], "latest");
    }
}
