use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
	Error, MemoryService, Result,
	notes::{CreateNote, NoteFilter},
};
use quill_store::models::{Note, NoteScope, NoteType};

const RECENT_NOTE_LIMIT: usize = 20;
const DREAM_TAG: &str = "dream";
const DEFAULT_SUMMARY_TITLE: &str = "Session summary";
const DEFAULT_SUMMARY_TEXT: &str =
	"Recent session notes were reviewed, but no structured summary is available.";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DreamSummary {
	pub title: String,
	pub summary: String,
	pub tags: Vec<String>,
	pub answered_questions: Vec<String>,
	/// The observation note the summary was persisted as.
	pub note_id: Option<Uuid>,
}

impl MemoryService {
	/// Memory "dreaming": asks the generation collaborator to condense the
	/// project's recent notes into a JSON summary, persisted as a tagged
	/// observation note. The cancellation token is honored immediately
	/// before and immediately after the network call; a malformed reply
	/// falls back to a fixed default summary instead of failing.
	pub async fn dream(
		&self,
		project_id: &str,
		cancel: &CancellationToken,
	) -> Result<DreamSummary> {
		let mut notes = self
			.list_notes(NoteFilter {
				scope: Some(NoteScope::Project),
				project_id: Some(project_id.to_string()),
				..Default::default()
			})
			.await?;

		notes.sort_by(|a, b| b.last_touched().cmp(&a.last_touched()));
		notes.truncate(RECENT_NOTE_LIMIT);

		let prompt = build_dream_prompt(project_id, &notes);

		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let raw = self.providers.generation.generate(&self.cfg, &prompt).await?;

		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let mut summary = parse_dream_reply(&raw).unwrap_or_else(default_summary);
		let mut tags = vec![DREAM_TAG.to_string()];

		tags.extend(summary.tags.iter().cloned());

		let note = self
			.create_note(CreateNote {
				scope: NoteScope::Project,
				project_id: Some(project_id.to_string()),
				arc_id: None,
				chapter_id: None,
				note_type: NoteType::Observation,
				text: summary.summary.clone(),
				tags,
				importance: 0.6,
				structured: None,
			})
			.await?;

		summary.note_id = Some(note.note_id);

		Ok(summary)
	}
}

fn build_dream_prompt(project_id: &str, notes: &[Note]) -> String {
	let mut prompt = String::new();

	prompt.push_str("You are consolidating an author's working memory for project \"");
	prompt.push_str(project_id);
	prompt.push_str("\".\nCondense the notes below into a short summary.\n");
	prompt.push_str(
		"Respond with JSON only: {\"title\": string, \"summary\": string, \
		 \"tags\": [string], \"answered_questions\": [string]}\n\nNotes:\n",
	);

	for note in notes {
		prompt.push_str("- ");
		prompt.push_str(&note.text);
		prompt.push('\n');
	}

	prompt
}

fn parse_dream_reply(raw: &str) -> Option<DreamSummary> {
	let trimmed = strip_code_fences(raw.trim());
	let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
	let title = value.get("title")?.as_str()?.trim().to_string();
	let summary = value.get("summary")?.as_str()?.trim().to_string();

	if title.is_empty() || summary.is_empty() {
		return None;
	}

	Some(DreamSummary {
		title,
		summary,
		tags: string_array(value.get("tags")),
		answered_questions: string_array(value.get("answered_questions")),
		note_id: None,
	})
}

fn default_summary() -> DreamSummary {
	DreamSummary {
		title: DEFAULT_SUMMARY_TITLE.to_string(),
		summary: DEFAULT_SUMMARY_TEXT.to_string(),
		tags: Vec::new(),
		answered_questions: Vec::new(),
		note_id: None,
	}
}

fn string_array(value: Option<&serde_json::Value>) -> Vec<String> {
	value
		.and_then(|value| value.as_array())
		.map(|items| {
			items
				.iter()
				.filter_map(|item| item.as_str())
				.map(str::to_string)
				.collect()
		})
		.unwrap_or_default()
}

fn strip_code_fences(raw: &str) -> &str {
	let Some(stripped) = raw.strip_prefix("```") else {
		return raw;
	};
	let stripped = stripped.strip_prefix("json").unwrap_or(stripped);

	stripped.strip_suffix("```").unwrap_or(stripped).trim()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_plain_json_reply() {
		let parsed = parse_dream_reply(
			"{\"title\": \"Arc one\", \"summary\": \"Sarah left the harbor.\", \
			 \"tags\": [\"arc-1\"], \"answered_questions\": [\"Where is Sarah?\"]}",
		)
		.expect("parse failed");

		assert_eq!(parsed.title, "Arc one");
		assert_eq!(parsed.tags, vec!["arc-1".to_string()]);
		assert_eq!(parsed.answered_questions.len(), 1);
	}

	#[test]
	fn parses_code_fenced_reply() {
		let parsed = parse_dream_reply(
			"```json\n{\"title\": \"Arc one\", \"summary\": \"Sarah left.\"}\n```",
		)
		.expect("parse failed");

		assert_eq!(parsed.summary, "Sarah left.");
	}

	#[test]
	fn malformed_reply_yields_none() {
		assert!(parse_dream_reply("The session went well, overall.").is_none());
		assert!(parse_dream_reply("{\"title\": \"no summary\"}").is_none());
	}
}
