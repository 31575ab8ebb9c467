use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::contracts::ClaimContracts;
use crate::error::WalletError;
use crate::quest::Quest;
use crate::signer::TransactionSigner;
use crate::tx_builder;
use crate::wallet::{SignOptions, SignResult, WalletConnection};

pub const QUEST_NOT_COMPLETED: &str = "Quest not completed yet";
pub const CLAIM_FAILED: &str = "Failed to claim rewards";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClaimStatus {
	#[default]
	Idle,
	Claiming,
	Success,
	Error(String),
}

/// Result of one claim attempt.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
	pub success: bool,
	pub error_message: Option<String>,
	pub finished_at: DateTime<Utc>,
	/// The wallet's answer, when it got that far.
	pub response: Option<SignResult>,
}

impl ClaimOutcome {
	fn failed(message: impl Into<String>, response: Option<SignResult>) -> Self {
		Self {
			success: false,
			error_message: Some(message.into()),
			finished_at: Utc::now(),
			response,
		}
	}
}

/// Total display value of a quest: its gems plus a fixed number of points
/// per reward by rarity.
pub fn calculate_reward_value(quest: &Quest) -> u64 {
	quest.gems + quest.rewards.iter().map(|r| r.rarity.points()).sum::<u64>()
}

/// Claims a completed quest's rewards through the connected wallet.
///
/// A claim is one atomic sign request: either the wallet accepts the whole
/// batch or the claim failed.  Failures are terminal; retrying is up to
/// the caller.
pub struct ClaimWorkflow {
	connection: WalletConnection,
	signer: TransactionSigner,
	contracts: ClaimContracts,
	status: watch::Sender<ClaimStatus>,
}

impl ClaimWorkflow {
	pub fn new(connection: WalletConnection, contracts: ClaimContracts) -> Self {
		let (status, _) = watch::channel(ClaimStatus::Idle);
		Self {
			signer: TransactionSigner::new(connection.clone()),
			connection,
			contracts,
			status,
		}
	}

	pub fn can_claim_rewards(&self) -> bool {
		self.connection.is_connected() && !self.connection.account().is_empty()
	}

	pub fn status(&self) -> ClaimStatus {
		self.status.borrow().clone()
	}

	pub fn is_claiming_rewards(&self) -> bool {
		*self.status.borrow() == ClaimStatus::Claiming
	}

	pub fn claim_error(&self) -> Option<String> {
		match &*self.status.borrow() {
			ClaimStatus::Error(message) => Some(message.clone()),
			_ => None,
		}
	}

	pub fn subscribe(&self) -> watch::Receiver<ClaimStatus> {
		self.status.subscribe()
	}

	pub fn calculate_reward_value(&self, quest: &Quest) -> u64 {
		calculate_reward_value(quest)
	}

	pub async fn claim_rewards(&self, quest: &Quest) -> bool {
		self.claim(quest).await.success
	}

	pub async fn claim(&self, quest: &Quest) -> ClaimOutcome {
		if !self.can_claim_rewards() {
			return self.reject(WalletError::NotConnected.to_string());
		}
		if !quest.completed {
			return self.reject(QUEST_NOT_COMPLETED.into());
		}

		let started = self.status.send_if_modified(|status| {
			if *status == ClaimStatus::Claiming {
				return false;
			}
			*status = ClaimStatus::Claiming;
			true
		});
		if !started {
			debug!(quest = quest.id, "claim already in progress");
			return ClaimOutcome::failed("A claim is already in progress", None);
		}
		let _claiming = ClaimingGuard(&self.status);

		let outcome = self.submit(quest).await;
		let next = match &outcome.error_message {
			None => ClaimStatus::Success,
			Some(message) => ClaimStatus::Error(message.clone()),
		};
		self.status.send_replace(next);
		outcome
	}

	async fn submit(&self, quest: &Quest) -> ClaimOutcome {
		let recipient = self.connection.account();
		let batch = match tx_builder::build_claim_batch(&self.contracts, quest, &recipient) {
			Ok(batch) => batch,
			Err(e) => {
				warn!(error = %e, quest = quest.id, "could not build claim batch");
				return ClaimOutcome::failed(e.to_string(), None);
			}
		};

		info!(quest = quest.id, to = %recipient, transactions = batch.len(), "submitting reward claim");
		match self
			.signer
			.sign_transaction(&batch, SignOptions { sign_only: false })
			.await
		{
			Ok(response) if response.is_success() => {
				info!(quest = quest.id, "rewards claimed");
				ClaimOutcome {
					success: true,
					error_message: None,
					finished_at: Utc::now(),
					response: Some(response),
				}
			}
			Ok(response) => {
				warn!(quest = quest.id, status = ?response.status, "wallet did not accept the claim");
				ClaimOutcome::failed(CLAIM_FAILED, Some(response))
			}
			Err(e) => {
				let message = e.to_string();
				if message.is_empty() {
					ClaimOutcome::failed(CLAIM_FAILED, None)
				} else {
					ClaimOutcome::failed(message, None)
				}
			}
		}
	}

	/// Fail before touching the wallet.
	fn reject(&self, message: String) -> ClaimOutcome {
		debug!(reason = %message, "claim rejected");
		self.status.send_if_modified(|status| {
			if *status == ClaimStatus::Claiming {
				return false;
			}
			*status = ClaimStatus::Error(message.clone());
			true
		});
		ClaimOutcome::failed(message, None)
	}
}

/// Releases the claiming state if the claim future is dropped mid-flight.
struct ClaimingGuard<'a>(&'a watch::Sender<ClaimStatus>);

impl Drop for ClaimingGuard<'_> {
	fn drop(&mut self) {
		self.0.send_if_modified(|status| {
			if *status != ClaimStatus::Claiming {
				return false;
			}
			*status = ClaimStatus::Idle;
			true
		});
	}
}
