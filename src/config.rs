use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::contracts::ClaimContracts;
use crate::wallet::ConnectionSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
	pub wallet: WalletConfig,
	pub catalog: CatalogConfig,
	#[serde(default)]
	pub contracts: ClaimContracts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
	/// JSON-RPC endpoint of the local wallet bridge.  Unset means no wallet.
	pub bridge_url: Option<String>,
	pub poll_interval_ms: u64,
	pub disconnect_debounce_ms: u64,
	/// Last account a `wallet connect` succeeded with.
	pub account: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
	pub api_url: String,
}

impl Default for WalletConfig {
	fn default() -> Self {
		Self {
			bridge_url: None,
			poll_interval_ms: 2000,
			disconnect_debounce_ms: 1000,
			account: None,
		}
	}
}

impl Default for CatalogConfig {
	fn default() -> Self {
		Self {
			api_url: "http://localhost:3000/api".into(),
		}
	}
}

impl Config {
	/// Directory where CLI state is stored (~/.ultra-quest/).
	pub fn dir() -> anyhow::Result<PathBuf> {
		dirs::home_dir()
			.map(|home| home.join(".ultra-quest"))
			.ok_or_else(|| anyhow!("could not determine home directory"))
	}

	/// Path to the config file.
	pub fn path() -> anyhow::Result<PathBuf> {
		Ok(Self::dir()?.join("config.toml"))
	}

	/// Load config from disk, falling back to defaults if no file exists.
	pub fn load() -> anyhow::Result<Self> {
		let path = Self::path()?;
		if path.exists() {
			let content = std::fs::read_to_string(&path)?;
			Ok(toml::from_str(&content)?)
		} else {
			Ok(Self::default())
		}
	}

	/// Persist the current config to disk, creating the directory if needed.
	pub fn save(&self) -> anyhow::Result<()> {
		let path = Self::path()?;
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&path, toml::to_string_pretty(self)?)?;
		Ok(())
	}

	pub fn connection_settings(&self) -> ConnectionSettings {
		ConnectionSettings {
			poll_interval: Duration::from_millis(self.wallet.poll_interval_ms.max(100)),
			disconnect_debounce: Duration::from_millis(self.wallet.disconnect_debounce_ms),
		}
	}
}
