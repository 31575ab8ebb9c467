pub mod bridge;
pub mod connection;

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::CapabilityError;

pub use connection::{
	BackgroundHandle, ConnectionSettings, ConnectionState, WalletConnection, WalletStatus,
};

/// One action handed to the wallet for signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
	pub action: String,
	pub contract: String,
	pub data: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
	/// Only succeed if the wallet already trusts this client; never prompt.
	pub only_if_trusted: bool,
}

impl ConnectOptions {
	pub fn trusted() -> Self {
		Self { only_if_trusted: true }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOptions {
	pub sign_only: bool,
}

/// Account payload returned by a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
	pub blockchainid: String,
	#[serde(rename = "publicKey")]
	pub public_key: String,
}

/// Whatever the wallet answered to a signing request, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignResult {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, Value>,
}

impl SignResult {
	pub fn success() -> Self {
		Self { status: Some("success".into()), ..Self::default() }
	}

	pub fn is_success(&self) -> bool {
		self.status.as_deref() == Some("success")
	}
}

/// Notifications pushed by wallets that support event subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
	Connect(ConnectResponse),
	Disconnect,
}

/// The external wallet capability.  Implementations talk to a browser
/// extension, a local bridge process, or a test double.
#[async_trait::async_trait]
pub trait WalletCapability: Send + Sync {
	async fn connect(&self, options: ConnectOptions) -> Result<ConnectResponse, CapabilityError>;

	async fn disconnect(&self) -> Result<(), CapabilityError>;

	async fn get_chain_id(&self) -> Result<String, CapabilityError>;

	async fn sign_transaction(
		&self,
		txs: &[TransactionDescriptor],
		options: SignOptions,
	) -> Result<SignResult, CapabilityError>;

	async fn sign_message(&self, message: &str) -> Result<SignResult, CapabilityError>;

	async fn purchase_item(
		&self,
		item_type: &str,
		item_id: &str,
	) -> Result<SignResult, CapabilityError>;

	/// Subscribe to `connect` / `disconnect` events.  Wallets without an
	/// event mechanism return `None` and are reconciled by polling alone.
	fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
		None
	}
}

/// The environment a wallet gets injected into.  Presence is re-checked on
/// every call because injection can happen after start-up.
pub trait WalletHost: Send + Sync {
	fn wallet(&self) -> Option<Arc<dyn WalletCapability>>;
}

/// A slot a wallet can be placed into (or removed from) at any time.
#[derive(Clone, Default)]
pub struct InjectedWallet {
	slot: Arc<RwLock<Option<Arc<dyn WalletCapability>>>>,
}

impl InjectedWallet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(wallet: Arc<dyn WalletCapability>) -> Self {
		let host = Self::new();
		host.inject(wallet);
		host
	}

	pub fn inject(&self, wallet: Arc<dyn WalletCapability>) {
		*self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(wallet);
	}

	pub fn remove(&self) {
		*self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
	}
}

impl WalletHost for InjectedWallet {
	fn wallet(&self) -> Option<Arc<dyn WalletCapability>> {
		self.slot
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}
}

/// A connected account as the wallet reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletIdentity {
	/// Raw id, possibly carrying an `@` suffix.
	pub blockchain_id: String,
	pub public_key: String,
	pub chain_id: Option<String>,
}

impl WalletIdentity {
	/// The cleaned account name used for display and as a transaction party.
	pub fn account(&self) -> String {
		clean_wallet_id(Some(&self.blockchain_id))
	}

	fn same_account(&self, other: &Self) -> bool {
		self.blockchain_id == other.blockchain_id && self.public_key == other.public_key
	}
}

impl From<ConnectResponse> for WalletIdentity {
	fn from(resp: ConnectResponse) -> Self {
		Self {
			blockchain_id: resp.blockchainid,
			public_key: resp.public_key,
			chain_id: None,
		}
	}
}

/// Strip the `@`-suffix from a raw blockchain id.
pub fn clean_wallet_id(id: Option<&str>) -> String {
	match id {
		Some(raw) => raw.split_once('@').map_or(raw, |(head, _)| head).to_owned(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clean_wallet_id_strips_suffix() {
		assert_eq!(clean_wallet_id(Some("abc123@eos")), "abc123");
		assert_eq!(clean_wallet_id(Some("abc123")), "abc123");
		assert_eq!(clean_wallet_id(Some("a@b@c")), "a");
		assert_eq!(clean_wallet_id(None), "");
	}

	#[test]
	fn identity_account_is_cleaned() {
		let id = WalletIdentity::from(ConnectResponse {
			blockchainid: "player1@ultra".into(),
			public_key: "EOS6pk".into(),
		});
		assert_eq!(id.account(), "player1");
		assert!(id.chain_id.is_none());
	}

	#[test]
	fn connect_response_uses_wallet_field_names() {
		let resp: ConnectResponse =
			serde_json::from_str(r#"{"blockchainid":"aa1bb2cc3dd4@ultra","publicKey":"EOS7x"}"#)
				.unwrap();
		assert_eq!(resp.blockchainid, "aa1bb2cc3dd4@ultra");
		assert_eq!(resp.public_key, "EOS7x");
	}

	#[test]
	fn sign_result_keeps_unknown_fields() {
		let res: SignResult =
			serde_json::from_str(r#"{"status":"success","transactionId":"ff00"}"#).unwrap();
		assert!(res.is_success());
		assert_eq!(res.extra["transactionId"], "ff00");

		let res: SignResult = serde_json::from_str(r#"{"status":"fail"}"#).unwrap();
		assert!(!res.is_success());
	}

	#[test]
	fn injected_wallet_tracks_presence() {
		let host = InjectedWallet::new();
		assert!(host.wallet().is_none());
	}
}
