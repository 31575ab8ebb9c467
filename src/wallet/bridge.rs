use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

use super::{
	ConnectOptions, ConnectResponse, SignOptions, SignResult, TransactionDescriptor,
	WalletCapability,
};
use crate::error::CapabilityError;

/// Talks to a locally running wallet bridge over JSON-RPC 2.0.
///
/// The bridge relays each call to the user's wallet extension and answers
/// with the extension's response, so method names and payloads mirror the
/// extension API (`connect`, `getChainId`, `signTransaction`, ...).  The
/// bridge has no push channel; state changes are picked up by polling.
pub struct WalletBridge {
	url: String,
	http: reqwest::Client,
	next_id: AtomicU64,
}

#[derive(Deserialize)]
struct Envelope<T> {
	data: T,
}

impl WalletBridge {
	pub fn new(url: &str) -> Self {
		Self {
			url: url.to_owned(),
			http: reqwest::Client::new(),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, CapabilityError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let body = request_body(id, method, params);
		trace!(method, id, "bridge call");

		let resp: Value = self
			.http
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|e| CapabilityError::new(format!("wallet bridge unreachable: {e}")))?
			.json()
			.await
			.map_err(|e| CapabilityError::new(format!("invalid bridge response: {e}")))?;

		parse_response(resp)
	}
}

fn request_body(id: u64, method: &str, params: Value) -> Value {
	json!({
		"id": id,
		"jsonrpc": "2.0",
		"method": method,
		"params": params,
	})
}

fn parse_response<T: DeserializeOwned>(mut resp: Value) -> Result<T, CapabilityError> {
	if let Some(err) = resp.get_mut("error").filter(|e| !e.is_null()).map(Value::take) {
		return Err(serde_json::from_value(err.clone()).unwrap_or_else(|_| {
			CapabilityError::new(format!("wallet bridge error: {err}"))
		}));
	}
	let result = resp.get_mut("result").map(Value::take).unwrap_or(Value::Null);
	serde_json::from_value(result)
		.map_err(|e| CapabilityError::new(format!("unexpected bridge result: {e}")))
}

#[async_trait::async_trait]
impl WalletCapability for WalletBridge {
	async fn connect(&self, options: ConnectOptions) -> Result<ConnectResponse, CapabilityError> {
		let env: Envelope<ConnectResponse> = self.call("connect", json!([options])).await?;
		Ok(env.data)
	}

	async fn disconnect(&self) -> Result<(), CapabilityError> {
		let _: Value = self.call("disconnect", json!([])).await?;
		Ok(())
	}

	async fn get_chain_id(&self) -> Result<String, CapabilityError> {
		let env: Envelope<String> = self.call("getChainId", json!([])).await?;
		Ok(env.data)
	}

	async fn sign_transaction(
		&self,
		txs: &[TransactionDescriptor],
		options: SignOptions,
	) -> Result<SignResult, CapabilityError> {
		self.call("signTransaction", json!([txs, options])).await
	}

	async fn sign_message(&self, message: &str) -> Result<SignResult, CapabilityError> {
		self.call("signMessage", json!([message])).await
	}

	async fn purchase_item(
		&self,
		item_type: &str,
		item_id: &str,
	) -> Result<SignResult, CapabilityError> {
		self.call("purchaseItem", json!([item_type, item_id])).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_uses_extension_argument_shapes() {
		let body = request_body(3, "connect", json!([ConnectOptions::trusted()]));
		assert_eq!(body["jsonrpc"], "2.0");
		assert_eq!(body["id"], 3);
		assert_eq!(body["params"][0]["onlyIfTrusted"], true);

		let body = request_body(4, "signTransaction", json!([[], SignOptions { sign_only: false }]));
		assert_eq!(body["params"][1]["signOnly"], false);
	}

	#[test]
	fn connect_result_is_unwrapped() {
		let resp = json!({
			"id": 1,
			"jsonrpc": "2.0",
			"result": {"data": {"blockchainid": "player1@ultra", "publicKey": "EOS5x"}}
		});
		let env: Envelope<ConnectResponse> = parse_response(resp).unwrap();
		assert_eq!(env.data.blockchainid, "player1@ultra");
	}

	#[test]
	fn rpc_error_keeps_code() {
		let resp = json!({
			"id": 1,
			"jsonrpc": "2.0",
			"error": {"code": 4001, "message": "User rejected the request"}
		});
		let err = parse_response::<Value>(resp).unwrap_err();
		assert_eq!(err.code, Some(4001));
		assert!(err.is_cancellation());
	}

	#[test]
	fn malformed_error_still_surfaces() {
		let resp = json!({"id": 1, "error": "bridge exploded"});
		let err = parse_response::<Value>(resp).unwrap_err();
		assert!(err.message.contains("bridge exploded"));
		assert!(err.code.is_none());
	}
}
