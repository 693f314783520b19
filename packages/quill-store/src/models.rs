use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, store::Document};
use quill_domain::facts::Conflict;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteScope {
	Project,
	Author,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
	Observation,
	Issue,
	Fact,
	Plan,
	Preference,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
	Initial,
	Update,
	Correction,
	Supersede,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
	Active,
	Completed,
	Abandoned,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchPriority {
	Low,
	Medium,
	High,
}

/// Chain membership. Flattened into the note document so chain_id is a
/// top-level field the store can equality-scan.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ChainLink {
	pub chain_id: Uuid,
	pub version: u32,
	pub change_type: ChangeType,
	pub change_reason: Option<String>,
	pub supersedes: Option<Uuid>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredContent {
	Bedside(BedsideContent),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct BedsideContent {
	pub current_focus: Option<String>,
	pub warnings: Vec<String>,
	pub active_goals: Vec<BedsideGoal>,
	pub next_steps: Vec<String>,
	pub open_questions: Vec<String>,
	pub recent_discoveries: Vec<String>,
	pub conflicts: Vec<Conflict>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BedsideGoal {
	pub title: String,
	#[serde(default)]
	pub progress: Option<f32>,
	#[serde(default)]
	pub status: Option<String>,
	#[serde(default)]
	pub note: Option<String>,
	#[serde(default)]
	pub updated_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Note {
	pub note_id: Uuid,
	pub scope: NoteScope,
	pub project_id: Option<String>,
	pub arc_id: Option<String>,
	pub chapter_id: Option<String>,
	#[serde(rename = "type")]
	pub note_type: NoteType,
	pub text: String,
	pub tags: Vec<String>,
	pub importance: f32,
	pub created_at: OffsetDateTime,
	pub updated_at: Option<OffsetDateTime>,
	pub embedding: Option<Vec<f32>>,
	pub bedside: bool,
	pub superseded: bool,
	#[serde(flatten)]
	pub chain: Option<ChainLink>,
	pub structured: Option<StructuredContent>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Goal {
	pub goal_id: Uuid,
	pub project_id: String,
	pub title: String,
	pub description: Option<String>,
	pub status: GoalStatus,
	pub progress: f32,
	pub parent_goal_id: Option<Uuid>,
	pub blocked_by: Vec<Uuid>,
	pub created_at: OffsetDateTime,
	pub updated_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WatchedEntity {
	pub entity_id: Uuid,
	pub name: String,
	pub project_id: String,
	pub priority: WatchPriority,
	pub reason: Option<String>,
	pub monitoring_enabled: bool,
	pub created_at: OffsetDateTime,
}

impl Note {
	/// The moment this note last changed; creation counts.
	pub fn last_touched(&self) -> OffsetDateTime {
		self.updated_at.unwrap_or(self.created_at)
	}

	pub fn to_document(&self) -> Result<Document> {
		Ok(Document { id: self.note_id, tags: self.tags.clone(), body: serde_json::to_value(self)? })
	}

	pub fn from_document(document: &Document) -> Result<Self> {
		Ok(serde_json::from_value(document.body.clone())?)
	}
}

impl Goal {
	pub fn last_touched(&self) -> OffsetDateTime {
		self.updated_at.unwrap_or(self.created_at)
	}

	pub fn to_document(&self) -> Result<Document> {
		Ok(Document { id: self.goal_id, tags: Vec::new(), body: serde_json::to_value(self)? })
	}

	pub fn from_document(document: &Document) -> Result<Self> {
		Ok(serde_json::from_value(document.body.clone())?)
	}
}

impl WatchedEntity {
	pub fn to_document(&self) -> Result<Document> {
		Ok(Document { id: self.entity_id, tags: Vec::new(), body: serde_json::to_value(self)? })
	}

	pub fn from_document(document: &Document) -> Result<Self> {
		Ok(serde_json::from_value(document.body.clone())?)
	}
}

impl NoteScope {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Project => "project",
			Self::Author => "author",
		}
	}
}

impl NoteType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Observation => "observation",
			Self::Issue => "issue",
			Self::Fact => "fact",
			Self::Plan => "plan",
			Self::Preference => "preference",
		}
	}
}

impl GoalStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Active => "active",
			Self::Completed => "completed",
			Self::Abandoned => "abandoned",
		}
	}

	pub fn is_closed(&self) -> bool {
		matches!(self, Self::Completed | Self::Abandoned)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn note() -> Note {
		Note {
			note_id: Uuid::new_v4(),
			scope: NoteScope::Project,
			project_id: Some("novel-1".to_string()),
			arc_id: None,
			chapter_id: None,
			note_type: NoteType::Fact,
			text: "Sarah has blue eyes".to_string(),
			tags: vec!["character:sarah".to_string()],
			importance: 0.8,
			created_at: OffsetDateTime::UNIX_EPOCH,
			updated_at: None,
			embedding: None,
			bedside: false,
			superseded: false,
			chain: None,
			structured: None,
		}
	}

	#[test]
	fn note_round_trips_through_document() {
		let original = note();
		let document = original.to_document().expect("to_document failed");
		let decoded = Note::from_document(&document).expect("from_document failed");

		assert_eq!(original, decoded);
	}

	#[test]
	fn chain_link_flattens_to_top_level_chain_id() {
		let mut with_chain = note();

		with_chain.chain = Some(ChainLink {
			chain_id: Uuid::new_v4(),
			version: 2,
			change_type: ChangeType::Update,
			change_reason: Some("eye color corrected".to_string()),
			supersedes: None,
		});

		let document = with_chain.to_document().expect("to_document failed");

		assert!(document.body.get("chain_id").is_some());

		let decoded = Note::from_document(&document).expect("from_document failed");

		assert_eq!(with_chain, decoded);
	}

	#[test]
	fn note_type_serializes_as_type_field() {
		let document = note().to_document().expect("to_document failed");

		assert_eq!(document.body.get("type").and_then(|value| value.as_str()), Some("fact"));
	}

	#[test]
	fn bedside_content_defaults_are_empty() {
		let content = BedsideContent::default();

		assert!(content.current_focus.is_none());
		assert!(content.warnings.is_empty());
		assert!(content.conflicts.is_empty());
	}
}
