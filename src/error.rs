use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 style code the wallet returns when the user rejects a prompt.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Error shape reported by the external wallet capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct CapabilityError {
	pub message: String,
	#[serde(default)]
	pub code: Option<i64>,
}

impl CapabilityError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into(), code: None }
	}

	pub fn with_code(message: impl Into<String>, code: i64) -> Self {
		Self { message: message.into(), code: Some(code) }
	}

	/// Whether the user deliberately dismissed the wallet prompt.
	pub fn is_cancellation(&self) -> bool {
		if self.code == Some(USER_REJECTED_CODE) {
			return true;
		}
		let msg = self.message.to_lowercase();
		["rejected", "cancelled", "canceled", "denied"]
			.iter()
			.any(|w| msg.contains(w))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
	#[error("Ultra wallet is not installed")]
	CapabilityAbsent,
	#[error("Wallet not connected")]
	NotConnected,
	#[error("request cancelled by user")]
	UserCancelled,
	#[error("{0}")]
	External(CapabilityError),
	#[error("{0}")]
	PreconditionFailed(String),
}

impl From<CapabilityError> for WalletError {
	fn from(e: CapabilityError) -> Self {
		if e.is_cancellation() {
			Self::UserCancelled
		} else {
			Self::External(e)
		}
	}
}

pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejection_code_is_cancellation() {
		let e = CapabilityError::with_code("whatever", 4001);
		assert!(e.is_cancellation());
		assert_eq!(WalletError::from(e), WalletError::UserCancelled);
	}

	#[test]
	fn cancellation_wording_is_recognised() {
		for msg in ["User rejected the request", "Request Cancelled", "access denied"] {
			assert!(CapabilityError::new(msg).is_cancellation(), "{msg}");
		}
	}

	#[test]
	fn other_failures_stay_external() {
		let e = CapabilityError::with_code("network unreachable", -32000);
		assert!(!e.is_cancellation());
		assert_eq!(
			WalletError::from(e.clone()).to_string(),
			"network unreachable"
		);
	}
}
