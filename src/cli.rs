use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
	name = "ultra-quest",
	about = "Claim quest rewards through your Ultra wallet.",
	version
)]
pub struct Cli {
	/// Override the wallet bridge endpoint.
	#[arg(long, global = true)]
	pub bridge_url: Option<String>,

	/// Override the quest catalog API URL.
	#[arg(long, global = true)]
	pub api_url: Option<String>,

	/// Log more (repeat for trace output).
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
	/// Connect, disconnect and inspect the wallet.
	Wallet {
		#[command(subcommand)]
		command: WalletCommand,
	},

	/// Sign messages and purchases with the connected wallet.
	Sign {
		#[command(subcommand)]
		command: SignCommand,
	},

	/// Browse quests and claim their rewards.
	Quest {
		#[command(subcommand)]
		command: QuestCommand,
	},
}

// -- Wallet subcommands --

#[derive(Subcommand)]
pub enum WalletCommand {
	/// Ask the wallet for a connection and remember the account.
	Connect,

	/// Disconnect the wallet.
	Disconnect,

	/// Show wallet presence and connection state.
	Status,

	/// Follow connection changes until interrupted.
	Watch,

	/// Set the wallet bridge endpoint.
	SetBridge {
		/// JSON-RPC URL of the local wallet bridge.
		#[arg(long)]
		url: String,
	},
}

// -- Sign subcommands --

#[derive(Subcommand)]
pub enum SignCommand {
	/// Sign an arbitrary message.
	Message {
		/// Message text; `message:` is prepended unless already prefixed.
		message: String,
	},

	/// Purchase an item through the wallet.
	Purchase {
		/// Item type, e.g. `uniq`.
		#[arg(long)]
		item_type: String,

		/// Item identifier.
		#[arg(long)]
		item_id: String,
	},
}

// -- Quest subcommands --

#[derive(Subcommand)]
pub enum QuestCommand {
	/// List quests in the catalog.
	List,

	/// Show a quest and its rewards.
	Show(QuestSource),

	/// Print a quest's total reward value.
	Value(QuestSource),

	/// Claim a completed quest's rewards to the connected wallet.
	Claim(QuestSource),
}

/// Where to read a quest from: the catalog by id, or a local JSON file.
#[derive(Args)]
pub struct QuestSource {
	/// Quest id in the catalog.
	#[arg(required_unless_present = "file", conflicts_with = "file")]
	pub id: Option<u64>,

	/// Read the quest from a JSON file instead of the catalog.
	#[arg(long)]
	pub file: Option<PathBuf>,
}
