//! Connection lifecycle for a single external wallet.
//!
//! All state lives in one [`WalletStatus`] value behind a `watch` channel.
//! User actions (connect / disconnect), the background poller and wallet
//! events all mutate it through [`WalletStatus::apply`], which enforces the
//! state machine:
//!
//! ```text
//! Uninitialized --detected--> Disconnected
//! Disconnected --connect--> Connecting --ok--> Connected
//!                                      --err-> Disconnected
//! Connected --disconnect--> Disconnecting --ok/err--> Disconnected (+ quiet window)
//!                                         --cancel--> Connected
//! Connected --event/poll miss--> Disconnected
//! ```
//!
//! While a transition is in flight, or during the quiet window that follows
//! a disconnect, reconciliation writes are refused so the poller cannot
//! resurrect a connection the user just tore down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::{ConnectOptions, WalletCapability, WalletEvent, WalletHost, WalletIdentity};
use crate::error::WalletError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_DISCONNECT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
	/// Cadence of the trusted-only reconnect poll.
	pub poll_interval: Duration,
	/// How long the poller stays quiet after a user disconnect completes.
	pub disconnect_debounce: Duration,
}

impl Default for ConnectionSettings {
	fn default() -> Self {
		Self {
			poll_interval: DEFAULT_POLL_INTERVAL,
			disconnect_debounce: DEFAULT_DISCONNECT_DEBOUNCE,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
	#[default]
	Uninitialized,
	Disconnected,
	Connecting,
	Connected(WalletIdentity),
	/// Holds the identity to restore if the user cancels.
	Disconnecting(Option<WalletIdentity>),
}

impl ConnectionState {
	pub fn identity(&self) -> Option<&WalletIdentity> {
		match self {
			Self::Connected(id) => Some(id),
			_ => None,
		}
	}

	pub fn is_connected(&self) -> bool {
		matches!(self, Self::Connected(_))
	}

	/// A user-initiated transition is in flight.
	pub fn is_busy(&self) -> bool {
		matches!(self, Self::Connecting | Self::Disconnecting(_))
	}
}

/// Snapshot published to observers on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletStatus {
	state: ConnectionState,
	error: Option<String>,
	quiet_until: Option<Instant>,
	/// Bumped on every user-initiated transition.
	epoch: u64,
}

#[derive(Debug, Clone)]
enum Transition {
	Detected,
	BeginConnect,
	ConnectOk(WalletIdentity),
	ConnectFailed(Option<String>),
	BeginDisconnect,
	DisconnectDone {
		error: Option<String>,
		quiet_until: Instant,
	},
	DisconnectCancelled,
	/// Reconciliation results carry the epoch they were started under, if
	/// any; a user transition in between makes them stale.
	Synced {
		identity: WalletIdentity,
		epoch: Option<u64>,
	},
	ExternalDisconnect {
		epoch: Option<u64>,
	},
	ChainId {
		blockchain_id: String,
		chain_id: String,
	},
	Error(Option<String>),
}

impl WalletStatus {
	pub fn state(&self) -> &ConnectionState {
		&self.state
	}

	pub fn identity(&self) -> Option<&WalletIdentity> {
		self.state.identity()
	}

	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	/// True while a disconnect is in flight or its quiet window is open.
	pub fn is_disconnecting_at(&self, now: Instant) -> bool {
		matches!(self.state, ConnectionState::Disconnecting(_))
			|| self.quiet_until.is_some_and(|until| now < until)
	}

	fn reconcile_suppressed_at(&self, now: Instant) -> bool {
		self.state.is_busy() || self.is_disconnecting_at(now)
	}

	fn is_stale(&self, epoch: Option<u64>) -> bool {
		epoch.is_some_and(|epoch| epoch != self.epoch)
	}

	/// The single write path.  Returns whether anything changed.
	fn apply(&mut self, transition: Transition, now: Instant) -> bool {
		use ConnectionState as S;

		let user = matches!(
			transition,
			Transition::BeginConnect
				| Transition::ConnectOk(_)
				| Transition::ConnectFailed(_)
				| Transition::BeginDisconnect
				| Transition::DisconnectDone { .. }
				| Transition::DisconnectCancelled
		);

		match transition {
			Transition::Detected => {
				if self.state != S::Uninitialized {
					return false;
				}
				self.state = S::Disconnected;
			}
			Transition::BeginConnect => {
				if self.state.is_busy() || self.state.is_connected() {
					return false;
				}
				self.state = S::Connecting;
				self.error = None;
			}
			Transition::ConnectOk(identity) => {
				if self.state != S::Connecting {
					return false;
				}
				self.state = S::Connected(identity);
				self.error = None;
			}
			Transition::ConnectFailed(error) => {
				if self.state != S::Connecting {
					return false;
				}
				self.state = S::Disconnected;
				if error.is_some() {
					self.error = error;
				}
			}
			Transition::BeginDisconnect => {
				if self.state.is_busy() {
					return false;
				}
				let previous = match std::mem::take(&mut self.state) {
					S::Connected(id) => Some(id),
					_ => None,
				};
				self.state = S::Disconnecting(previous);
				self.error = None;
			}
			Transition::DisconnectDone { error, quiet_until } => {
				if !matches!(self.state, S::Disconnecting(_)) {
					return false;
				}
				self.state = S::Disconnected;
				self.error = error;
				self.quiet_until = Some(quiet_until);
			}
			Transition::DisconnectCancelled => {
				let restored = match &mut self.state {
					S::Disconnecting(previous) => previous.take(),
					_ => return false,
				};
				self.state = restored.map_or(S::Disconnected, S::Connected);
			}
			Transition::Synced { identity, epoch } => {
				if self.is_stale(epoch) || self.reconcile_suppressed_at(now) {
					return false;
				}
				if let S::Connected(current) = &self.state {
					if current.same_account(&identity) {
						return false;
					}
				}
				self.state = S::Connected(identity);
			}
			Transition::ExternalDisconnect { epoch } => {
				if self.is_stale(epoch) || !self.state.is_connected() {
					return false;
				}
				self.state = S::Disconnected;
			}
			Transition::ChainId { blockchain_id, chain_id } => match &mut self.state {
				S::Connected(id)
					if id.blockchain_id == blockchain_id
						&& id.chain_id.as_deref() != Some(chain_id.as_str()) =>
				{
					id.chain_id = Some(chain_id);
				}
				_ => return false,
			},
			Transition::Error(error) => {
				if self.error == error {
					return false;
				}
				self.error = error;
			}
		}
		if user {
			self.epoch = self.epoch.wrapping_add(1);
		}
		true
	}
}

/// Handle to one wallet connection.  Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct WalletConnection {
	inner: Arc<Inner>,
}

struct Inner {
	host: Arc<dyn WalletHost>,
	status: watch::Sender<WalletStatus>,
	eager_attempted: AtomicBool,
	settings: ConnectionSettings,
}

impl WalletConnection {
	pub fn new(host: Arc<dyn WalletHost>, settings: ConnectionSettings) -> Self {
		let (status, _) = watch::channel(WalletStatus::default());
		Self {
			inner: Arc::new(Inner {
				host,
				status,
				eager_attempted: AtomicBool::new(false),
				settings,
			}),
		}
	}

	pub fn settings(&self) -> ConnectionSettings {
		self.inner.settings
	}

	// -- Read side --

	pub fn is_installed(&self) -> bool {
		self.inner.host.wallet().is_some()
	}

	pub(crate) fn wallet(&self) -> Option<Arc<dyn WalletCapability>> {
		self.inner.host.wallet()
	}

	pub fn status(&self) -> WalletStatus {
		self.inner.status.borrow().clone()
	}

	pub fn state(&self) -> ConnectionState {
		self.inner.status.borrow().state.clone()
	}

	pub fn identity(&self) -> Option<WalletIdentity> {
		self.inner.status.borrow().identity().cloned()
	}

	/// Cleaned account name, or empty when disconnected.
	pub fn account(&self) -> String {
		self.inner
			.status
			.borrow()
			.identity()
			.map(WalletIdentity::account)
			.unwrap_or_default()
	}

	pub fn error(&self) -> Option<String> {
		self.inner.status.borrow().error.clone()
	}

	pub fn is_connected(&self) -> bool {
		self.inner.status.borrow().state.is_connected()
	}

	pub fn is_connecting(&self) -> bool {
		self.inner.status.borrow().state == ConnectionState::Connecting
	}

	pub fn is_disconnecting(&self) -> bool {
		self.inner.status.borrow().is_disconnecting_at(Instant::now())
	}

	/// Observe every state change.
	pub fn subscribe(&self) -> watch::Receiver<WalletStatus> {
		self.inner.status.subscribe()
	}

	pub fn clear_error(&self) {
		self.apply(Transition::Error(None));
	}

	pub(crate) fn set_error(&self, message: String) {
		self.apply(Transition::Error(Some(message)));
	}

	fn apply(&self, transition: Transition) -> bool {
		let now = Instant::now();
		self.inner
			.status
			.send_if_modified(|status| status.apply(transition, now))
	}

	fn require_wallet(&self) -> Option<Arc<dyn WalletCapability>> {
		match self.wallet() {
			Some(wallet) => {
				self.apply(Transition::Detected);
				Some(wallet)
			}
			None => {
				self.set_error(WalletError::CapabilityAbsent.to_string());
				None
			}
		}
	}

	// -- User-initiated transitions --

	/// Ask the wallet for a connection, prompting the user if needed.
	pub async fn connect(&self, options: ConnectOptions) -> bool {
		self.connect_with(options, false).await
	}

	/// Trusted-only connect, attempted at most once per connection.  Never
	/// surfaces an error.
	pub async fn eager_connect(&self) -> bool {
		if self.is_connected() {
			return true;
		}
		if !self.is_installed() {
			debug!("eager connect skipped: no wallet present");
			return false;
		}
		if self.inner.eager_attempted.swap(true, Ordering::SeqCst) {
			return self.is_connected();
		}
		self.connect_with(ConnectOptions::trusted(), true).await
	}

	async fn connect_with(&self, options: ConnectOptions, silent: bool) -> bool {
		if self.is_connected() {
			return true;
		}
		let Some(wallet) = self.require_wallet() else {
			return false;
		};
		if !self.apply(Transition::BeginConnect) {
			debug!("connect ignored: another transition is in flight");
			return false;
		}

		let guard = Pending::new(self, Transition::ConnectFailed(None));
		let result = wallet.connect(options).await;
		guard.disarm();

		match result {
			Ok(resp) => {
				let identity = WalletIdentity::from(resp);
				let blockchain_id = identity.blockchain_id.clone();
				info!(account = %identity.account(), trusted = options.only_if_trusted, "wallet connected");
				self.apply(Transition::ConnectOk(identity));
				self.refresh_chain_id(wallet, blockchain_id);
				true
			}
			Err(e) => {
				let error = WalletError::from(e);
				let surfaced = match &error {
					_ if silent => {
						debug!(%error, "trusted connect declined");
						None
					}
					WalletError::UserCancelled => {
						debug!("connect cancelled by user");
						None
					}
					_ => {
						warn!(%error, "wallet connect failed");
						Some(error.to_string())
					}
				};
				self.apply(Transition::ConnectFailed(surfaced));
				false
			}
		}
	}

	/// Tear down the connection.  A user cancellation leaves the connection
	/// intact; any other failure still clears local state.
	pub async fn disconnect(&self) -> bool {
		let Some(wallet) = self.require_wallet() else {
			return false;
		};
		if !self.apply(Transition::BeginDisconnect) {
			debug!("disconnect ignored: another transition is in flight");
			return false;
		}

		let guard = Pending::new(self, Transition::DisconnectCancelled);
		let result = wallet.disconnect().await;
		guard.disarm();

		let quiet_until = Instant::now() + self.inner.settings.disconnect_debounce;
		match result.map_err(WalletError::from) {
			Ok(()) => {
				info!("wallet disconnected");
				self.apply(Transition::DisconnectDone { error: None, quiet_until });
				true
			}
			Err(WalletError::UserCancelled) => {
				debug!("disconnect cancelled by user");
				self.apply(Transition::DisconnectCancelled);
				false
			}
			Err(error) => {
				warn!(%error, "wallet disconnect failed, clearing local state anyway");
				self.apply(Transition::DisconnectDone {
					error: Some(error.to_string()),
					quiet_until,
				});
				false
			}
		}
	}

	// -- Reconciliation --

	/// One tick of the background poll: a trusted-only connect that keeps
	/// local state in line with the wallet.  No-op while a transition or
	/// its quiet window is active.
	pub async fn poll_once(&self) {
		let Some(wallet) = self.wallet() else {
			return;
		};
		self.apply(Transition::Detected);
		let (suppressed, epoch) = {
			let status = self.inner.status.borrow();
			(status.reconcile_suppressed_at(Instant::now()), status.epoch)
		};
		if suppressed {
			trace!("poll suppressed");
			return;
		}

		match wallet.connect(ConnectOptions::trusted()).await {
			Ok(resp) => {
				let identity = WalletIdentity::from(resp);
				let blockchain_id = identity.blockchain_id.clone();
				if self.apply(Transition::Synced { identity, epoch: Some(epoch) }) {
					debug!("poll synced wallet identity");
					self.refresh_chain_id(wallet, blockchain_id);
				}
			}
			Err(error) => {
				if self.apply(Transition::ExternalDisconnect { epoch: Some(epoch) }) {
					info!(%error, "wallet no longer connected");
				}
			}
		}
	}

	/// Apply a wallet-pushed event.
	pub fn handle_event(&self, event: WalletEvent) {
		match event {
			WalletEvent::Connect(resp) => {
				let identity = WalletIdentity::from(resp);
				let blockchain_id = identity.blockchain_id.clone();
				if self.apply(Transition::Synced { identity, epoch: None }) {
					info!("wallet connected (event)");
				}
				if let Some(wallet) = self.wallet() {
					self.refresh_chain_id(wallet, blockchain_id);
				}
			}
			WalletEvent::Disconnect => {
				if self.apply(Transition::ExternalDisconnect { epoch: None }) {
					info!("wallet disconnected (event)");
				}
			}
		}
	}

	/// Start the poll + event reconciler.  Dropping the handle stops it and
	/// releases the event subscription.
	pub fn spawn_background(&self) -> BackgroundHandle {
		let this = self.clone();
		BackgroundHandle {
			task: tokio::spawn(async move { this.reconcile_loop().await }),
		}
	}

	async fn reconcile_loop(self) {
		let mut ticker = tokio::time::interval(self.inner.settings.poll_interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		let mut subscribed: Option<Arc<dyn WalletCapability>> = None;
		let mut events: Option<broadcast::Receiver<WalletEvent>> = None;

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					let current = self.wallet();
					let changed = match (&subscribed, &current) {
						(Some(a), Some(b)) => !same_wallet(a, b),
						(None, None) => false,
						_ => true,
					};
					if changed {
						if events.take().is_some() {
							debug!("dropping wallet event subscription");
						}
						events = current.as_ref().and_then(|w| w.subscribe());
						if events.is_some() {
							debug!("subscribed to wallet events");
						}
						subscribed = current;
					}
					self.poll_once().await;
				}
				event = next_event(&mut events) => match event {
					Some(event) => self.handle_event(event),
					None => events = None,
				},
			}
		}
	}

	/// Fetch the chain id without holding up the caller.
	fn refresh_chain_id(&self, wallet: Arc<dyn WalletCapability>, blockchain_id: String) {
		let this = self.clone();
		tokio::spawn(async move {
			match wallet.get_chain_id().await {
				Ok(chain_id) => {
					this.apply(Transition::ChainId { blockchain_id, chain_id });
				}
				Err(error) => debug!(%error, "chain id unavailable"),
			}
		});
	}
}

/// Keeps the reconciler running while alive.
pub struct BackgroundHandle {
	task: JoinHandle<()>,
}

impl Drop for BackgroundHandle {
	fn drop(&mut self) {
		self.task.abort();
	}
}

/// Rolls back a busy state if the owning future is dropped mid-call.
struct Pending<'a> {
	connection: &'a WalletConnection,
	rollback: Option<Transition>,
}

impl<'a> Pending<'a> {
	fn new(connection: &'a WalletConnection, rollback: Transition) -> Self {
		Self { connection, rollback: Some(rollback) }
	}

	fn disarm(mut self) {
		self.rollback = None;
	}
}

impl Drop for Pending<'_> {
	fn drop(&mut self) {
		if let Some(rollback) = self.rollback.take() {
			self.connection.apply(rollback);
		}
	}
}

async fn next_event(events: &mut Option<broadcast::Receiver<WalletEvent>>) -> Option<WalletEvent> {
	let Some(rx) = events else {
		return std::future::pending().await;
	};
	loop {
		match rx.recv().await {
			Ok(event) => return Some(event),
			Err(RecvError::Lagged(skipped)) => warn!(skipped, "wallet events lagged"),
			Err(RecvError::Closed) => return None,
		}
	}
}

fn same_wallet(a: &Arc<dyn WalletCapability>, b: &Arc<dyn WalletCapability>) -> bool {
	std::ptr::eq(
		Arc::as_ptr(a) as *const (),
		Arc::as_ptr(b) as *const (),
	)
}
