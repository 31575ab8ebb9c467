use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{WalletError, WalletResult};
use crate::wallet::{SignOptions, SignResult, TransactionDescriptor, WalletCapability, WalletConnection};

/// Prefixes the wallet already understands as a message envelope.
pub const MESSAGE_PREFIXES: [&str; 3] = ["0x", "UOSx", "message:"];

/// Wrap a plain message in the `message:` envelope unless it already
/// carries a recognised prefix.
pub fn normalize_message(message: &str) -> String {
	if MESSAGE_PREFIXES.iter().any(|p| message.starts_with(p)) {
		message.to_owned()
	} else {
		format!("message:{message}")
	}
}

/// Forwards signing requests to the connected wallet.  Holds no state of its
/// own: it only reads the connection, and failures are reported on the
/// connection's error surface.  Nothing is retried.
#[derive(Clone)]
pub struct TransactionSigner {
	connection: WalletConnection,
}

impl TransactionSigner {
	pub fn new(connection: WalletConnection) -> Self {
		Self { connection }
	}

	pub fn connection(&self) -> &WalletConnection {
		&self.connection
	}

	pub async fn sign_transaction(
		&self,
		txs: &[TransactionDescriptor],
		options: SignOptions,
	) -> WalletResult<SignResult> {
		let result = match self.ready() {
			Ok(wallet) => {
				debug!(count = txs.len(), sign_only = options.sign_only, "requesting transaction signature");
				wallet.sign_transaction(txs, options).await.map_err(WalletError::from)
			}
			Err(e) => Err(e),
		};
		self.report(result)
	}

	pub async fn sign_message(&self, message: &str) -> WalletResult<SignResult> {
		let result = match self.ready() {
			Ok(wallet) => wallet
				.sign_message(&normalize_message(message))
				.await
				.map_err(WalletError::from),
			Err(e) => Err(e),
		};
		self.report(result)
	}

	pub async fn purchase_item(&self, item_type: &str, item_id: &str) -> WalletResult<SignResult> {
		let result = match self.ready() {
			Ok(wallet) => {
				debug!(item_type, item_id, "requesting item purchase");
				wallet.purchase_item(item_type, item_id).await.map_err(WalletError::from)
			}
			Err(e) => Err(e),
		};
		self.report(result)
	}

	fn ready(&self) -> WalletResult<Arc<dyn WalletCapability>> {
		if !self.connection.is_connected() {
			return Err(WalletError::NotConnected);
		}
		self.connection.wallet().ok_or(WalletError::CapabilityAbsent)
	}

	fn report(&self, result: WalletResult<SignResult>) -> WalletResult<SignResult> {
		match &result {
			Ok(_) | Err(WalletError::UserCancelled) => {}
			Err(error) => {
				warn!(%error, "signing failed");
				self.connection.set_error(error.to_string());
			}
		}
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn plain_messages_get_envelope() {
		assert_eq!(normalize_message("hello"), "message:hello");
		assert_eq!(normalize_message(""), "message:");
	}

	#[test]
	fn prefixed_messages_pass_through() {
		for msg in ["0xdeadbeef", "UOSx1234", "message:already"] {
			assert_eq!(normalize_message(msg), msg);
		}
	}
}
