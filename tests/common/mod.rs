//! Scriptable in-memory wallet shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};

use ultra_quest::error::CapabilityError;
use ultra_quest::quest::{Quest, Rarity, Reward, RewardType};
use ultra_quest::wallet::{
	ConnectOptions, ConnectResponse, ConnectionSettings, InjectedWallet, SignOptions, SignResult,
	TransactionDescriptor, WalletCapability, WalletConnection, WalletEvent,
};

pub const ACCOUNT: &str = "player1@ultra";
pub const CHAIN_ID: &str = "a9c481dfbc7d9506dc7e87e9a137c931b0a9303f64fd7a1d08b8230133920097";

pub struct MockWallet {
	connect_result: Mutex<Result<ConnectResponse, CapabilityError>>,
	disconnect_result: Mutex<Result<(), CapabilityError>>,
	chain_id: Mutex<Result<String, CapabilityError>>,
	sign_result: Mutex<Result<SignResult, CapabilityError>>,
	connect_gate: Mutex<Option<oneshot::Receiver<()>>>,
	disconnect_gate: Mutex<Option<oneshot::Receiver<()>>>,
	sign_gate: Mutex<Option<oneshot::Receiver<()>>>,
	events: Option<broadcast::Sender<WalletEvent>>,

	pub connect_calls: Mutex<Vec<ConnectOptions>>,
	pub disconnect_calls: Mutex<usize>,
	pub sign_calls: Mutex<Vec<(Vec<TransactionDescriptor>, SignOptions)>>,
	pub messages: Mutex<Vec<String>>,
	pub purchases: Mutex<Vec<(String, String)>>,
}

pub fn account(blockchainid: &str) -> ConnectResponse {
	ConnectResponse {
		blockchainid: blockchainid.into(),
		public_key: "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV".into(),
	}
}

impl MockWallet {
	pub fn new() -> Self {
		Self {
			connect_result: Mutex::new(Ok(account(ACCOUNT))),
			disconnect_result: Mutex::new(Ok(())),
			chain_id: Mutex::new(Ok(CHAIN_ID.into())),
			sign_result: Mutex::new(Ok(SignResult::success())),
			connect_gate: Mutex::new(None),
			disconnect_gate: Mutex::new(None),
			sign_gate: Mutex::new(None),
			events: None,
			connect_calls: Mutex::new(Vec::new()),
			disconnect_calls: Mutex::new(0),
			sign_calls: Mutex::new(Vec::new()),
			messages: Mutex::new(Vec::new()),
			purchases: Mutex::new(Vec::new()),
		}
	}

	pub fn with_events() -> Self {
		let (tx, _) = broadcast::channel(16);
		Self { events: Some(tx), ..Self::new() }
	}

	pub fn set_connect(&self, result: Result<ConnectResponse, CapabilityError>) {
		*self.connect_result.lock().unwrap() = result;
	}

	pub fn set_disconnect(&self, result: Result<(), CapabilityError>) {
		*self.disconnect_result.lock().unwrap() = result;
	}

	pub fn set_chain_id(&self, result: Result<String, CapabilityError>) {
		*self.chain_id.lock().unwrap() = result;
	}

	pub fn set_sign(&self, result: Result<SignResult, CapabilityError>) {
		*self.sign_result.lock().unwrap() = result;
	}

	/// Make the next connect wait until the returned sender fires.  The
	/// reply is fixed when the call starts.
	pub fn hold_connect(&self) -> oneshot::Sender<()> {
		let (tx, rx) = oneshot::channel();
		*self.connect_gate.lock().unwrap() = Some(rx);
		tx
	}

	/// Make the next disconnect wait until the returned sender fires.
	pub fn hold_disconnect(&self) -> oneshot::Sender<()> {
		let (tx, rx) = oneshot::channel();
		*self.disconnect_gate.lock().unwrap() = Some(rx);
		tx
	}

	/// Make the next sign_transaction wait until the returned sender fires.
	pub fn hold_sign(&self) -> oneshot::Sender<()> {
		let (tx, rx) = oneshot::channel();
		*self.sign_gate.lock().unwrap() = Some(rx);
		tx
	}

	pub fn emit(&self, event: WalletEvent) {
		let tx = self.events.as_ref().expect("mock created without events");
		tx.send(event).expect("no subscriber");
	}

	pub fn connect_count(&self) -> usize {
		self.connect_calls.lock().unwrap().len()
	}

	pub fn trusted_connect_count(&self) -> usize {
		self.connect_calls
			.lock()
			.unwrap()
			.iter()
			.filter(|o| o.only_if_trusted)
			.count()
	}

	pub fn sign_count(&self) -> usize {
		self.sign_calls.lock().unwrap().len()
	}
}

#[async_trait::async_trait]
impl WalletCapability for MockWallet {
	async fn connect(&self, options: ConnectOptions) -> Result<ConnectResponse, CapabilityError> {
		self.connect_calls.lock().unwrap().push(options);
		let result = self.connect_result.lock().unwrap().clone();
		let gate = self.connect_gate.lock().unwrap().take();
		if let Some(gate) = gate {
			let _ = gate.await;
		}
		result
	}

	async fn disconnect(&self) -> Result<(), CapabilityError> {
		*self.disconnect_calls.lock().unwrap() += 1;
		let gate = self.disconnect_gate.lock().unwrap().take();
		if let Some(gate) = gate {
			let _ = gate.await;
		}
		self.disconnect_result.lock().unwrap().clone()
	}

	async fn get_chain_id(&self) -> Result<String, CapabilityError> {
		self.chain_id.lock().unwrap().clone()
	}

	async fn sign_transaction(
		&self,
		txs: &[TransactionDescriptor],
		options: SignOptions,
	) -> Result<SignResult, CapabilityError> {
		self.sign_calls.lock().unwrap().push((txs.to_vec(), options));
		let gate = self.sign_gate.lock().unwrap().take();
		if let Some(gate) = gate {
			let _ = gate.await;
		}
		self.sign_result.lock().unwrap().clone()
	}

	async fn sign_message(&self, message: &str) -> Result<SignResult, CapabilityError> {
		self.messages.lock().unwrap().push(message.to_owned());
		Ok(SignResult::success())
	}

	async fn purchase_item(
		&self,
		item_type: &str,
		item_id: &str,
	) -> Result<SignResult, CapabilityError> {
		self.purchases
			.lock()
			.unwrap()
			.push((item_type.to_owned(), item_id.to_owned()));
		Ok(SignResult::success())
	}

	fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
		self.events.as_ref().map(|tx| tx.subscribe())
	}
}

pub fn settings() -> ConnectionSettings {
	ConnectionSettings {
		poll_interval: Duration::from_millis(2000),
		disconnect_debounce: Duration::from_millis(1000),
	}
}

pub fn connection(wallet: &Arc<MockWallet>) -> WalletConnection {
	connection_with(wallet, settings())
}

pub fn connection_with(wallet: &Arc<MockWallet>, settings: ConnectionSettings) -> WalletConnection {
	let host = InjectedWallet::with(wallet.clone());
	WalletConnection::new(Arc::new(host), settings)
}

/// Wait (bounded) until the connection status satisfies `f`.
pub async fn wait_until(
	conn: &WalletConnection,
	f: impl FnMut(&ultra_quest::wallet::WalletStatus) -> bool,
) {
	let mut rx = conn.subscribe();
	tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
		.await
		.expect("timed out waiting for wallet state")
		.expect("status channel closed");
}

/// Wait (bounded) until the wallet has seen `n` connect calls.
pub async fn wait_for_connects(wallet: &MockWallet, n: usize) {
	tokio::time::timeout(Duration::from_secs(5), async {
		while wallet.connect_count() < n {
			tokio::task::yield_now().await;
		}
	})
	.await
	.expect("timed out waiting for connect call");
}

pub fn quest(completed: bool) -> Quest {
	Quest {
		id: 42,
		title: "Dragon Slayer".into(),
		category: "combat".into(),
		gems: 50,
		completed,
		rewards: vec![
			Reward {
				id: 9,
				name: "Dragon Scale".into(),
				kind: RewardType::Nft,
				rarity: Rarity::Legendary,
				description: "A shimmering scale".into(),
			},
			Reward {
				id: 10,
				name: "Red Cape".into(),
				kind: RewardType::Skin,
				rarity: Rarity::Rare,
				description: "Flows in the wind".into(),
			},
		],
	}
}
