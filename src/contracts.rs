use serde::{Deserialize, Serialize};

pub const TOKEN_CONTRACT: &str = "eosio.token";
pub const NFT_CONTRACT: &str = "eosio.nft.ft";
pub const QUEST_CONTRACT: &str = "utquest.ultra";
pub const QUEST_SYSTEM_ACCOUNT: &str = "questsystem";
pub const CURRENCY_SYMBOL: &str = "UOS";

/// On-chain accounts a reward claim touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimContracts {
	/// Token contract that carries the gem transfer.
	pub token: String,
	/// Uniq factory contract that issues NFT rewards.
	pub nft: String,
	/// Quest contract that records every other reward type.
	pub quest: String,
	/// Account that pays out gems and rewards.
	pub quest_system_account: String,
	pub currency_symbol: String,
}

impl Default for ClaimContracts {
	fn default() -> Self {
		Self {
			token: TOKEN_CONTRACT.into(),
			nft: NFT_CONTRACT.into(),
			quest: QUEST_CONTRACT.into(),
			quest_system_account: QUEST_SYSTEM_ACCOUNT.into(),
			currency_symbol: CURRENCY_SYMBOL.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn account_names_fit_the_name_format() {
		let c = ClaimContracts::default();
		for name in [&c.token, &c.nft, &c.quest, &c.quest_system_account] {
			assert!(name.len() <= 13, "{name} is too long");
			assert!(
				name.chars().all(|ch| matches!(ch, 'a'..='z' | '1'..='5' | '.')),
				"{name} has invalid characters"
			);
		}
	}

	#[test]
	fn partial_override_keeps_defaults() {
		let c: ClaimContracts = toml::from_str(r#"quest_system_account = "qsys.test""#).unwrap();
		assert_eq!(c.quest_system_account, "qsys.test");
		assert_eq!(c.token, TOKEN_CONTRACT);
	}
}
