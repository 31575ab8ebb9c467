use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::quest::Quest;

#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("quest {0} not found")]
	NotFound(u64),
	#[error("catalog request failed: {0}")]
	Http(#[from] reqwest::Error),
}

/// Read-only client for the quest catalog REST service.
///
/// The service exposes plain CRUD over categories, quests, tasks and
/// rewards; claiming only ever needs the quest endpoints, which return
/// quests with their rewards expanded.
pub struct CatalogClient {
	base_url: String,
	http: reqwest::Client,
}

impl CatalogClient {
	pub fn new(base_url: &str) -> Self {
		Self {
			base_url: base_url.trim_end_matches('/').to_owned(),
			http: reqwest::Client::new(),
		}
	}

	pub fn quests_url(&self) -> String {
		format!("{}/quests", self.base_url)
	}

	pub fn quest_url(&self, id: u64) -> String {
		format!("{}/quests/{id}", self.base_url)
	}

	pub async fn list_quests(&self) -> Result<Vec<Quest>, CatalogError> {
		let url = self.quests_url();
		debug!(%url, "listing quests");
		let quests = self
			.http
			.get(&url)
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		Ok(quests)
	}

	pub async fn get_quest(&self, id: u64) -> Result<Quest, CatalogError> {
		let url = self.quest_url(id);
		debug!(%url, "fetching quest");
		let resp = self.http.get(&url).send().await?;
		if resp.status() == StatusCode::NOT_FOUND {
			return Err(CatalogError::NotFound(id));
		}
		Ok(resp.error_for_status()?.json().await?)
	}
}
