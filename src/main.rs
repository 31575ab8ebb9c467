use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ultra_quest::cli::{Cli, Command};
use ultra_quest::commands;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	match &cli.command {
		Command::Wallet { command } => commands::wallet::run(&cli, command).await,
		Command::Sign { command } => commands::sign::run(&cli, command).await,
		Command::Quest { command } => commands::quest::run(&cli, command).await,
	}
}

/// `RUST_LOG` wins; otherwise `-v` raises the default level.
fn init_tracing(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "ultra_quest=debug",
		_ => "ultra_quest=trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
