use anyhow::Result;

use crate::cli::{Cli, SignCommand};
use crate::commands::{ensure_connected, open_wallet};
use crate::config::Config;
use crate::signer::TransactionSigner;
use crate::wallet::SignResult;

pub async fn run(cli: &Cli, cmd: &SignCommand) -> Result<()> {
	let config = Config::load()?;
	let wallet = open_wallet(cli, &config);
	ensure_connected(&wallet).await?;
	let signer = TransactionSigner::new(wallet);

	let result = match cmd {
		SignCommand::Message { message } => {
			println!("Signing message...");
			signer.sign_message(message).await?
		}
		SignCommand::Purchase { item_type, item_id } => {
			println!("Requesting purchase of {item_type} {item_id}...");
			signer.purchase_item(item_type, item_id).await?
		}
	};
	print_result(&result)
}

fn print_result(result: &SignResult) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(result)?);
	Ok(())
}
