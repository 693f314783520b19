use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MemoryService, Result};
use quill_store::{
	models::{WatchPriority, WatchedEntity},
	store::{Collection, FieldEq},
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateWatchedEntity {
	pub name: String,
	pub project_id: String,
	#[serde(default = "default_priority")]
	pub priority: WatchPriority,
	#[serde(default)]
	pub reason: Option<String>,
}

fn default_priority() -> WatchPriority {
	WatchPriority::Medium
}

impl MemoryService {
	pub async fn create_watched_entity(&self, input: CreateWatchedEntity) -> Result<WatchedEntity> {
		let name = input.name.trim().to_string();

		if name.is_empty() {
			return Err(Error::Validation {
				message: "Watched entity name must be non-empty.".to_string(),
			});
		}
		if input.project_id.trim().is_empty() {
			return Err(Error::Validation {
				message: "Watched entities require a project_id.".to_string(),
			});
		}

		let entity = WatchedEntity {
			entity_id: Uuid::new_v4(),
			name,
			project_id: input.project_id.trim().to_string(),
			priority: input.priority,
			reason: input.reason,
			monitoring_enabled: true,
			created_at: OffsetDateTime::now_utc(),
		};

		self.store.add(Collection::Entities, entity.to_document()?).await?;

		Ok(entity)
	}

	pub async fn list_watched_entities(&self, project_id: &str) -> Result<Vec<WatchedEntity>> {
		let filters = [FieldEq::new("project_id", project_id)];
		let documents = self.store.scan(Collection::Entities, &filters).await?;
		let mut entities = Vec::with_capacity(documents.len());

		for document in &documents {
			entities.push(WatchedEntity::from_document(document)?);
		}

		entities.sort_by_key(|entity| entity.created_at);

		Ok(entities)
	}

	pub async fn set_entity_monitoring(&self, entity_id: Uuid, enabled: bool) -> Result<WatchedEntity> {
		let Some(document) = self.store.get(Collection::Entities, entity_id).await? else {
			return Err(Error::NotFound { message: format!("Unknown watched entity {entity_id}.") });
		};
		let mut entity = WatchedEntity::from_document(&document)?;

		entity.monitoring_enabled = enabled;

		self.store.put(Collection::Entities, entity.to_document()?).await?;

		Ok(entity)
	}

	pub async fn delete_watched_entity(&self, entity_id: Uuid) -> Result<()> {
		if !self.store.delete(Collection::Entities, entity_id).await? {
			return Err(Error::NotFound { message: format!("Unknown watched entity {entity_id}.") });
		}

		Ok(())
	}
}
