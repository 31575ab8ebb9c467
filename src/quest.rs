use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
	pub id: u64,
	pub title: String,
	#[serde(default)]
	pub category: String,
	pub gems: u64,
	#[serde(default)]
	pub completed: bool,
	#[serde(default)]
	pub rewards: Vec<Reward>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
	pub id: u64,
	pub name: String,
	#[serde(rename = "type")]
	pub kind: RewardType,
	pub rarity: Rarity,
	#[serde(default)]
	pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
	Skin,
	Item,
	Nft,
	Currency,
	Utility,
}

impl RewardType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Skin => "skin",
			Self::Item => "item",
			Self::Nft => "nft",
			Self::Currency => "currency",
			Self::Utility => "utility",
		}
	}
}

impl fmt::Display for RewardType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Reward rarity.  Names outside the known tiers are kept verbatim so they
/// survive into on-chain metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Rarity {
	Common,
	Rare,
	Epic,
	Legendary,
	Other(String),
}

impl Rarity {
	/// Display points a reward of this rarity adds to a quest's value.
	pub fn points(&self) -> u64 {
		match self {
			Self::Common => 10,
			Self::Rare => 25,
			Self::Epic => 50,
			Self::Legendary => 100,
			Self::Other(_) => 0,
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			Self::Common => "common",
			Self::Rare => "rare",
			Self::Epic => "epic",
			Self::Legendary => "legendary",
			Self::Other(name) => name,
		}
	}
}

impl From<String> for Rarity {
	fn from(name: String) -> Self {
		match name.as_str() {
			"common" => Self::Common,
			"rare" => Self::Rare,
			"epic" => Self::Epic,
			"legendary" => Self::Legendary,
			_ => Self::Other(name),
		}
	}
}

impl From<Rarity> for String {
	fn from(rarity: Rarity) -> Self {
		match rarity {
			Rarity::Other(name) => name,
			known => known.as_str().to_owned(),
		}
	}
}

impl fmt::Display for Rarity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Read a single quest from a JSON file.
pub fn load_quest_file(path: &Path) -> Result<Quest> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("could not read {}", path.display()))?;
	serde_json::from_str(&content).with_context(|| format!("invalid quest JSON in {}", path.display()))
}
