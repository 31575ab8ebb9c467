use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::contracts::ClaimContracts;
use crate::quest::{Quest, Reward, RewardType};
use crate::wallet::TransactionDescriptor;

/// Metadata attached to every reward transaction.
#[derive(Debug, Serialize)]
struct RewardMetadata<'a> {
	name: &'a str,
	description: &'a str,
	rarity: &'a str,
	quest_id: u64,
	reward_id: u64,
}

/// Build the ordered transaction batch that pays out a quest: the gem
/// transfer first, then one transaction per reward.
///
/// `recipient` must already be the cleaned account name.  Nothing here
/// checks whether the quest is completed; that is the caller's job.
pub fn build_claim_batch(
	contracts: &ClaimContracts,
	quest: &Quest,
	recipient: &str,
) -> Result<Vec<TransactionDescriptor>> {
	let mut batch = Vec::with_capacity(1 + quest.rewards.len());
	batch.push(build_gem_transfer(contracts, quest, recipient));
	for reward in &quest.rewards {
		batch.push(build_reward_tx(contracts, quest, reward, recipient)?);
	}
	Ok(batch)
}

/// Fixed 4-decimal asset amount, e.g. `50.0000 UOS`.
pub fn format_quantity(amount: u64, symbol: &str) -> String {
	format!("{amount}.0000 {symbol}")
}

fn build_gem_transfer(contracts: &ClaimContracts, quest: &Quest, recipient: &str) -> TransactionDescriptor {
	TransactionDescriptor {
		action: "transfer".into(),
		contract: contracts.token.clone(),
		data: json!({
			"from": contracts.quest_system_account,
			"to": recipient,
			"quantity": format_quantity(quest.gems, &contracts.currency_symbol),
			"memo": format!("Quest reward: {} ({} gems)", quest.title, quest.gems),
		}),
	}
}

fn build_reward_tx(
	contracts: &ClaimContracts,
	quest: &Quest,
	reward: &Reward,
	recipient: &str,
) -> Result<TransactionDescriptor> {
	let metadata = serde_json::to_string(&RewardMetadata {
		name: &reward.name,
		description: &reward.description,
		rarity: reward.rarity.as_str(),
		quest_id: quest.id,
		reward_id: reward.id,
	})?;
	let memo = format!("Quest reward: {}", reward.name);

	Ok(match reward.kind {
		RewardType::Nft => TransactionDescriptor {
			action: "issue".into(),
			contract: contracts.nft.clone(),
			data: json!({
				"to": recipient,
				"token_configs": [{
					"token_factory_id": reward.id,
					"amount": 1,
					"custom_data": metadata,
				}],
				"memo": memo,
			}),
		},
		kind => TransactionDescriptor {
			action: "transfer".into(),
			contract: contracts.quest.clone(),
			data: json!({
				"from": contracts.quest_system_account,
				"to": recipient,
				"reward_type": kind.as_str(),
				"reward_data": metadata,
				"memo": memo,
			}),
		},
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::quest::Rarity;

	fn quest() -> Quest {
		Quest {
			id: 42,
			title: "Dragon Slayer".into(),
			category: "combat".into(),
			gems: 50,
			completed: true,
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

	#[test]
	fn batch_has_gem_transfer_then_one_tx_per_reward() {
		let batch = build_claim_batch(&ClaimContracts::default(), &quest(), "player1").unwrap();
		assert_eq!(batch.len(), 3);

		assert_eq!(batch[0].action, "transfer");
		assert_eq!(batch[0].contract, "eosio.token");
		assert_eq!(batch[0].data["quantity"], "50.0000 UOS");
		assert_eq!(batch[0].data["to"], "player1");
		assert_eq!(batch[0].data["from"], "questsystem");

		assert_eq!(batch[1].action, "issue");
		assert_eq!(batch[1].contract, "eosio.nft.ft");

		assert_eq!(batch[2].action, "transfer");
		assert_eq!(batch[2].contract, "utquest.ultra");
		assert_eq!(batch[2].data["reward_type"], "skin");
	}

	#[test]
	fn memos_name_the_reward() {
		let batch = build_claim_batch(&ClaimContracts::default(), &quest(), "player1").unwrap();
		let memo = batch[0].data["memo"].as_str().unwrap();
		assert!(memo.contains("Dragon Slayer") && memo.contains("50"));
		assert_eq!(batch[1].data["memo"], "Quest reward: Dragon Scale");
		assert_eq!(batch[2].data["memo"], "Quest reward: Red Cape");
	}

	#[test]
	fn nft_custom_data_carries_metadata() {
		let batch = build_claim_batch(&ClaimContracts::default(), &quest(), "player1").unwrap();
		let config = &batch[1].data["token_configs"][0];
		assert_eq!(config["amount"], 1);
		assert_eq!(config["token_factory_id"], 9);

		let raw = config["custom_data"].as_str().unwrap();
		let meta: serde_json::Value = serde_json::from_str(raw).unwrap();
		assert_eq!(meta["name"], "Dragon Scale");
		assert_eq!(meta["rarity"], "legendary");
		assert_eq!(meta["quest_id"], 42);
		assert_eq!(meta["reward_id"], 9);
	}

	#[test]
	fn unlisted_rarity_reaches_metadata_verbatim() {
		let mut q = quest();
		q.rewards[1].rarity = Rarity::from("mythic".to_owned());
		let batch = build_claim_batch(&ClaimContracts::default(), &q, "player1").unwrap();

		let raw = batch[2].data["reward_data"].as_str().unwrap();
		let meta: serde_json::Value = serde_json::from_str(raw).unwrap();
		assert_eq!(meta["rarity"], "mythic");
	}

	#[test]
	fn quest_without_rewards_is_just_the_gem_transfer() {
		let mut q = quest();
		q.rewards.clear();
		q.gems = 0;
		let batch = build_claim_batch(&ClaimContracts::default(), &q, "player1").unwrap();
		assert_eq!(batch.len(), 1);
		assert_eq!(batch[0].data["quantity"], "0.0000 UOS");
	}
}
