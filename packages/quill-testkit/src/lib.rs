//! Shared fixtures for engine and store tests: a default config, builders
//! for backdated notes/goals/entities, and direct-seeding helpers that
//! bypass the service write path when a test needs full control over
//! timestamps and importance.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use quill_config::Config;
use quill_store::{
	memory::MemStore,
	models::{Goal, GoalStatus, Note, NoteScope, NoteType, WatchPriority, WatchedEntity},
	store::{Collection, Document, Store},
};

pub const TEST_PROJECT: &str = "novel-1";

pub fn test_config() -> Config {
	Config::default()
}

pub fn note(project_id: &str, text: &str, tags: &[&str], importance: f32) -> Note {
	Note {
		note_id: Uuid::new_v4(),
		scope: NoteScope::Project,
		project_id: Some(project_id.to_string()),
		arc_id: None,
		chapter_id: None,
		note_type: NoteType::Fact,
		text: text.to_string(),
		tags: tags.iter().map(|tag| tag.to_string()).collect(),
		importance,
		created_at: OffsetDateTime::now_utc(),
		updated_at: None,
		embedding: None,
		bedside: false,
		superseded: false,
		chain: None,
		structured: None,
	}
}

/// A note whose creation (and last update) lies `age_days` in the past,
/// the input shape for decay and archive tests.
pub fn backdated_note(
	project_id: &str,
	text: &str,
	tags: &[&str],
	importance: f32,
	age_days: i64,
) -> Note {
	let mut out = note(project_id, text, tags, importance);

	out.created_at = OffsetDateTime::now_utc() - Duration::days(age_days);

	out
}

pub fn goal(project_id: &str, title: &str, progress: f32) -> Goal {
	Goal {
		goal_id: Uuid::new_v4(),
		project_id: project_id.to_string(),
		title: title.to_string(),
		description: None,
		status: GoalStatus::Active,
		progress,
		parent_goal_id: None,
		blocked_by: Vec::new(),
		created_at: OffsetDateTime::now_utc(),
		updated_at: None,
	}
}

pub fn watched_entity(project_id: &str, name: &str) -> WatchedEntity {
	WatchedEntity {
		entity_id: Uuid::new_v4(),
		name: name.to_string(),
		project_id: project_id.to_string(),
		priority: WatchPriority::Medium,
		reason: None,
		monitoring_enabled: true,
		created_at: OffsetDateTime::now_utc(),
	}
}

pub async fn seed_note(store: &MemStore, note: &Note) {
	let document = note.to_document().expect("Failed to encode seed note.");

	store.put(Collection::Notes, document).await.expect("Failed to seed note.");
}

pub async fn seed_goal(store: &MemStore, goal: &Goal) {
	let document = goal.to_document().expect("Failed to encode seed goal.");

	store.put(Collection::Goals, document).await.expect("Failed to seed goal.");
}

pub async fn seed_entity(store: &MemStore, entity: &WatchedEntity) {
	let document = entity.to_document().expect("Failed to encode seed entity.");

	store.put(Collection::Entities, document).await.expect("Failed to seed entity.");
}

/// Raw document fetch for asserting on persisted state.
pub async fn stored_note(store: &MemStore, note_id: Uuid) -> Option<Note> {
	let document: Option<Document> =
		store.get(Collection::Notes, note_id).await.expect("Failed to read note.");

	document.map(|document| Note::from_document(&document).expect("Failed to decode note."))
}
