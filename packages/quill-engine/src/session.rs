use uuid::Uuid;

use quill_domain::text;
use quill_store::models::{Goal, Note};

/// Append-only, process-local delta log for one interactive session.
/// Never persisted; the owner constructs it at session start and calls
/// `reset` at session boundaries.
#[derive(Debug, Default)]
pub struct SessionTracker {
	created_notes: Vec<(Uuid, String)>,
	updated_notes: Vec<Uuid>,
	deleted_notes: Vec<Uuid>,
	created_goals: Vec<(Uuid, String)>,
}

impl SessionTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn reset(&mut self) {
		self.created_notes.clear();
		self.updated_notes.clear();
		self.deleted_notes.clear();
		self.created_goals.clear();
	}

	pub fn record_note_created(&mut self, note: &Note) {
		self.created_notes.push((note.note_id, note.text.clone()));
	}

	pub fn record_note_updated(&mut self, note_id: Uuid) {
		self.updated_notes.push(note_id);
	}

	pub fn record_note_deleted(&mut self, note_id: Uuid) {
		self.deleted_notes.push(note_id);
	}

	pub fn record_goal_created(&mut self, goal: &Goal) {
		self.created_goals.push((goal.goal_id, goal.title.clone()));
	}

	pub fn is_empty(&self) -> bool {
		self.created_notes.is_empty()
			&& self.updated_notes.is_empty()
			&& self.deleted_notes.is_empty()
			&& self.created_goals.is_empty()
	}

	/// Token-Jaccard against notes created this session only. A cheap
	/// guard against the agent issuing the same "remember this" twice in
	/// one turn.
	pub fn has_recent_similar_memory(&self, input: &str, threshold: f32) -> bool {
		self.created_notes
			.iter()
			.any(|(_, created_text)| text::token_jaccard(input, created_text) >= threshold)
	}

	/// Short delta line for tool-call responses, so callers learn what
	/// changed this turn without rebuilding the full context.
	pub fn summary(&self) -> String {
		if self.is_empty() {
			return "No memory changes this session.".to_string();
		}

		let mut parts = Vec::new();

		if !self.created_notes.is_empty() {
			parts.push(plural(self.created_notes.len(), "note created", "notes created"));
		}
		if !self.updated_notes.is_empty() {
			parts.push(plural(self.updated_notes.len(), "note updated", "notes updated"));
		}
		if !self.deleted_notes.is_empty() {
			parts.push(plural(self.deleted_notes.len(), "note deleted", "notes deleted"));
		}
		if !self.created_goals.is_empty() {
			parts.push(plural(self.created_goals.len(), "goal created", "goals created"));
		}

		parts.join(", ")
	}
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
	if count == 1 { format!("1 {singular}") } else { format!("{count} {plural}") }
}
