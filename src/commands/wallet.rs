use anyhow::Result;

use crate::cli::{Cli, WalletCommand};
use crate::commands::{ensure_connected, open_wallet, resolve_bridge};
use crate::config::Config;
use crate::wallet::{ConnectionState, WalletConnection, WalletStatus};

pub async fn run(cli: &Cli, cmd: &WalletCommand) -> Result<()> {
	match cmd {
		WalletCommand::SetBridge { url } => set_bridge(url),
		WalletCommand::Connect => connect(cli).await,
		WalletCommand::Disconnect => disconnect(cli).await,
		WalletCommand::Status => show_status(cli).await,
		WalletCommand::Watch => watch(cli).await,
	}
}

fn set_bridge(url: &str) -> Result<()> {
	let mut config = Config::load()?;
	config.wallet.bridge_url = Some(url.to_owned());
	config.save()?;
	println!("Wallet bridge set to: {url}");
	Ok(())
}

async fn connect(cli: &Cli) -> Result<()> {
	let mut config = Config::load()?;
	let wallet = open_wallet(cli, &config);
	ensure_connected(&wallet).await?;

	let account = wallet.account();
	println!("Connected: {account}");

	config.wallet.account = Some(account);
	config.save()?;
	println!("Account saved to config.");
	Ok(())
}

async fn disconnect(cli: &Cli) -> Result<()> {
	let mut config = Config::load()?;
	let wallet = open_wallet(cli, &config);
	if !wallet.is_installed() {
		anyhow::bail!("No wallet bridge configured.");
	}
	wallet.eager_connect().await;

	if wallet.disconnect().await {
		println!("Disconnected.");
	} else if let Some(err) = wallet.error() {
		// Local state is cleared even when the wallet reports a failure.
		println!("Disconnected locally; wallet reported: {err}");
	} else {
		println!("Disconnect cancelled.");
		return Ok(());
	}

	config.wallet.account = None;
	config.save()?;
	Ok(())
}

async fn show_status(cli: &Cli) -> Result<()> {
	let config = Config::load()?;
	let wallet = open_wallet(cli, &config);

	println!("Wallet");
	println!(
		"  Bridge:   {}",
		resolve_bridge(cli, &config).as_deref().unwrap_or("not set")
	);
	if !wallet.is_installed() {
		println!("  Status:   not installed");
		return Ok(());
	}

	wallet.eager_connect().await;
	// Give the chain id lookup a moment; it never blocks the connection.
	let _ = tokio::time::timeout(
		std::time::Duration::from_millis(500),
		wallet
			.subscribe()
			.wait_for(|s| s.identity().map_or(true, |id| id.chain_id.is_some())),
	)
	.await;

	print_status(&wallet.status());
	if !wallet.is_connected() {
		let last = config.wallet.account.as_deref().unwrap_or("none");
		println!("  Last:     {last}");
	}
	Ok(())
}

/// Run the poll/event reconciler and print every transition.
async fn watch(cli: &Cli) -> Result<()> {
	let config = Config::load()?;
	let wallet: WalletConnection = open_wallet(cli, &config);
	if !wallet.is_installed() {
		anyhow::bail!("No wallet bridge configured.");
	}

	let _background = wallet.spawn_background();
	let mut changes = wallet.subscribe();
	println!("Watching wallet (Ctrl-C to stop)...");

	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			changed = changes.changed() => {
				if changed.is_err() {
					break;
				}
				let status = changes.borrow_and_update().clone();
				print_status(&status);
			}
		}
	}
	Ok(())
}

fn print_status(status: &WalletStatus) {
	match status.state() {
		ConnectionState::Connected(id) => {
			println!("  Status:   connected");
			println!("  Account:  {}", id.account());
			println!("  Key:      {}", id.public_key);
			println!("  Chain:    {}", id.chain_id.as_deref().unwrap_or("unknown"));
		}
		ConnectionState::Connecting => println!("  Status:   connecting"),
		ConnectionState::Disconnecting(_) => println!("  Status:   disconnecting"),
		ConnectionState::Disconnected | ConnectionState::Uninitialized => {
			println!("  Status:   disconnected")
		}
	}
	if let Some(err) = status.error() {
		println!("  Error:    {err}");
	}
}
