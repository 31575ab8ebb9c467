use anyhow::Result;

use crate::catalog::CatalogClient;
use crate::claim::{calculate_reward_value, ClaimWorkflow};
use crate::cli::{Cli, QuestCommand, QuestSource};
use crate::commands::{ensure_connected, load_quest, open_wallet, resolve_catalog};
use crate::config::Config;
use crate::quest::Quest;

pub async fn run(cli: &Cli, cmd: &QuestCommand) -> Result<()> {
	let config = Config::load()?;

	match cmd {
		QuestCommand::List => list_quests(cli, &config).await,
		QuestCommand::Show(source) => {
			let quest = load_quest(cli, &config, source).await?;
			show_quest(&quest);
			Ok(())
		}
		QuestCommand::Value(source) => {
			let quest = load_quest(cli, &config, source).await?;
			println!("{}", calculate_reward_value(&quest));
			Ok(())
		}
		QuestCommand::Claim(source) => claim(cli, &config, source).await,
	}
}

async fn list_quests(cli: &Cli, config: &Config) -> Result<()> {
	let catalog = CatalogClient::new(&resolve_catalog(cli, config));
	let quests = catalog.list_quests().await?;

	for q in &quests {
		let done = if q.completed { "done" } else { "open" };
		println!(
			"#{:<5} {:<6} {:<32} {:>6} gems  {} reward(s)",
			q.id,
			done,
			q.title,
			q.gems,
			q.rewards.len()
		);
	}

	if quests.is_empty() {
		println!("No quests found.");
	} else {
		println!("\n{} quest(s) total.", quests.len());
	}
	Ok(())
}

fn show_quest(quest: &Quest) {
	println!("Quest #{}: {}", quest.id, quest.title);
	println!("  Category:  {}", quest.category);
	println!("  Gems:      {}", quest.gems);
	println!("  Completed: {}", if quest.completed { "yes" } else { "no" });
	println!("  Value:     {}", calculate_reward_value(quest));
	for r in &quest.rewards {
		println!("  - {} [{} / {}] {}", r.name, r.kind, r.rarity, r.description);
	}
}

async fn claim(cli: &Cli, config: &Config, source: &QuestSource) -> Result<()> {
	let quest = load_quest(cli, config, source).await?;
	if !quest.completed {
		anyhow::bail!("Quest not completed yet");
	}

	let wallet = open_wallet(cli, config);
	ensure_connected(&wallet).await?;

	let workflow = ClaimWorkflow::new(wallet.clone(), config.contracts.clone());
	println!(
		"Claiming {} gems and {} reward(s) for {}...",
		quest.gems,
		quest.rewards.len(),
		wallet.account()
	);

	let outcome = workflow.claim(&quest).await;
	if !outcome.success {
		let reason = outcome.error_message.unwrap_or_else(|| "unknown error".into());
		anyhow::bail!("claim failed: {reason}");
	}

	println!("Rewards claimed at {}.", outcome.finished_at.to_rfc3339());
	if let Some(resp) = outcome.response {
		println!("{}", serde_json::to_string_pretty(&resp)?);
	}
	Ok(())
}
