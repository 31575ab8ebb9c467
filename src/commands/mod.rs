pub mod quest;
pub mod sign;
pub mod wallet;

use std::sync::Arc;

use anyhow::Result;

use crate::catalog::CatalogClient;
use crate::cli::{Cli, QuestSource};
use crate::config::Config;
use crate::quest::{load_quest_file, Quest};
use crate::wallet::bridge::WalletBridge;
use crate::wallet::{InjectedWallet, WalletConnection};

/// Resolve the bridge URL from CLI flag or config.
pub fn resolve_bridge(cli: &Cli, config: &Config) -> Option<String> {
	cli.bridge_url
		.clone()
		.or_else(|| config.wallet.bridge_url.clone())
}

/// Resolve the catalog API URL from CLI flag or config.
pub fn resolve_catalog(cli: &Cli, config: &Config) -> String {
	cli.api_url
		.clone()
		.unwrap_or_else(|| config.catalog.api_url.clone())
}

/// Build a wallet connection.  The bridge only counts as an installed
/// wallet when one is configured.
pub fn open_wallet(cli: &Cli, config: &Config) -> WalletConnection {
	let host = InjectedWallet::new();
	if let Some(url) = resolve_bridge(cli, config) {
		host.inject(Arc::new(WalletBridge::new(&url)));
	}
	WalletConnection::new(Arc::new(host), config.connection_settings())
}

/// Reconnect silently if the wallet already trusts us, otherwise prompt.
pub async fn ensure_connected(wallet: &WalletConnection) -> Result<()> {
	if !wallet.is_installed() {
		anyhow::bail!("No wallet bridge configured. Run: ultra-quest wallet set-bridge --url <url>");
	}
	if wallet.eager_connect().await {
		return Ok(());
	}
	println!("Approve the connection in your wallet...");
	if wallet.connect(Default::default()).await {
		return Ok(());
	}
	let reason = wallet
		.error()
		.unwrap_or_else(|| "connection was cancelled".into());
	anyhow::bail!("could not connect wallet: {reason}")
}

/// Load a quest from the catalog or a local file.
pub async fn load_quest(cli: &Cli, config: &Config, source: &QuestSource) -> Result<Quest> {
	if let Some(path) = &source.file {
		return load_quest_file(path);
	}
	let id = source
		.id
		.ok_or_else(|| anyhow::anyhow!("a quest id or --file is required"))?;
	let catalog = CatalogClient::new(&resolve_catalog(cli, config));
	Ok(catalog.get_quest(id).await?)
}
