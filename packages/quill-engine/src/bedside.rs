use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MemoryService, Result, chains::EvolveOptions, notes};
use quill_domain::facts::{self, Conflict};
use quill_store::{
	models::{BedsideContent, ChangeType, Note, NoteScope, NoteType, StructuredContent},
	store::{Collection, FieldEq},
};

const DEFAULT_BEDSIDE_TEXT: &str = "Planning note: nothing recorded yet.";
const DEFAULT_BEDSIDE_IMPORTANCE: f32 = 0.8;
const ROLLUP_LINE_MAX_CHARS: usize = 120;
const ROLLUP_HISTORY_LIMIT: usize = 10;

/// Identity of one bedside singleton: a project, optionally narrowed to an
/// arc and further to a chapter.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BedsideKey {
	pub project_id: String,
	pub arc_id: Option<String>,
	pub chapter_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct BedsideEvolution {
	pub note: Note,
	pub conflicts: Vec<Conflict>,
}

impl BedsideKey {
	pub fn project(project_id: impl Into<String>) -> Self {
		Self { project_id: project_id.into(), arc_id: None, chapter_id: None }
	}

	pub fn arc(project_id: impl Into<String>, arc_id: impl Into<String>) -> Self {
		Self { project_id: project_id.into(), arc_id: Some(arc_id.into()), chapter_id: None }
	}

	pub fn chapter(
		project_id: impl Into<String>,
		arc_id: Option<String>,
		chapter_id: impl Into<String>,
	) -> Self {
		Self { project_id: project_id.into(), arc_id, chapter_id: Some(chapter_id.into()) }
	}

	/// The next scope up: chapter rolls to its arc (or straight to the
	/// project without one), an arc rolls to the project.
	pub fn parent(&self) -> Option<Self> {
		if self.chapter_id.is_some() {
			return Some(match self.arc_id.as_ref() {
				Some(arc_id) => Self::arc(self.project_id.clone(), arc_id.clone()),
				None => Self::project(self.project_id.clone()),
			});
		}
		if self.arc_id.is_some() {
			return Some(Self::project(self.project_id.clone()));
		}

		None
	}

	fn filters(&self) -> Vec<FieldEq> {
		vec![
			FieldEq::new("bedside", true),
			FieldEq::new("project_id", self.project_id.as_str()),
			FieldEq::new("arc_id", optional(self.arc_id.as_deref())),
			FieldEq::new("chapter_id", optional(self.chapter_id.as_deref())),
		]
	}

	fn label(&self) -> String {
		match (self.arc_id.as_deref(), self.chapter_id.as_deref()) {
			(_, Some(chapter_id)) => format!("chapter {chapter_id}"),
			(Some(arc_id), None) => format!("arc {arc_id}"),
			(None, None) => "project".to_string(),
		}
	}
}

fn optional(value: Option<&str>) -> Value {
	match value {
		Some(value) => Value::String(value.to_string()),
		None => Value::Null,
	}
}

impl MemoryService {
	pub async fn bedside_note(&self, key: &BedsideKey) -> Result<Option<Note>> {
		let filters = key.filters();
		let documents = self.store.scan(Collection::Notes, &filters).await?;
		let mut notes = Vec::with_capacity(documents.len());

		for document in &documents {
			notes.push(Note::from_document(document)?);
		}

		// The marker moves with the newest version on evolve; if a racing
		// write left two marked, prefer the highest chain version.
		notes.sort_by_key(|note| note.chain.as_ref().map(|link| link.version).unwrap_or(0));

		Ok(notes.pop())
	}

	pub async fn ensure_bedside_note(&self, key: &BedsideKey) -> Result<Note> {
		if let Some(existing) = self.bedside_note(key).await? {
			return Ok(existing);
		}

		if key.project_id.trim().is_empty() {
			return Err(Error::Validation {
				message: "Bedside notes require a project_id.".to_string(),
			});
		}

		let embedding = self.embed_text(DEFAULT_BEDSIDE_TEXT).await?;
		let note = Note {
			note_id: Uuid::new_v4(),
			scope: NoteScope::Project,
			project_id: Some(key.project_id.clone()),
			arc_id: key.arc_id.clone(),
			chapter_id: key.chapter_id.clone(),
			note_type: NoteType::Plan,
			text: DEFAULT_BEDSIDE_TEXT.to_string(),
			tags: Vec::new(),
			importance: DEFAULT_BEDSIDE_IMPORTANCE,
			created_at: OffsetDateTime::now_utc(),
			updated_at: None,
			embedding: Some(embedding),
			bedside: true,
			superseded: false,
			chain: None,
			structured: Some(StructuredContent::Bedside(BedsideContent::default())),
		};

		self.store.add(Collection::Notes, note.to_document()?).await?;

		Ok(note)
	}

	/// Runs conflict detection against the current text, folds detected
	/// conflicts into the content, evolves the singleton, then best-effort
	/// rolls a one-line summary up to the parent scope. Conflicts never
	/// block the evolve.
	pub async fn evolve_bedside_note(
		&self,
		key: &BedsideKey,
		new_text: &str,
		mut content: BedsideContent,
	) -> Result<BedsideEvolution> {
		let current = self.ensure_bedside_note(key).await?;
		let conflicts = facts::detect_conflicts(self.extractor.as_ref(), &current.text, new_text);

		for conflict in &conflicts {
			content.warnings.push(format!(
				"Possible contradiction: \"{}\" vs \"{}\"",
				conflict.previous, conflict.current
			));
		}

		content.conflicts.extend(conflicts.iter().cloned());

		let note = self
			.evolve_note(current.note_id, new_text, EvolveOptions {
				change_type: ChangeType::Update,
				change_reason: None,
				keep_original: false,
				structured: Some(StructuredContent::Bedside(content)),
			})
			.await?;

		if let Some(parent) = key.parent()
			&& let Err(err) = self.roll_up_summary(&parent, key, new_text).await
		{
			tracing::warn!(
				project_id = %key.project_id,
				error = %err,
				"Bedside summary rollup failed; planning note is unaffected.",
			);
		}

		Ok(BedsideEvolution { note, conflicts })
	}

	async fn roll_up_summary(
		&self,
		parent: &BedsideKey,
		child: &BedsideKey,
		new_text: &str,
	) -> Result<()> {
		let mut note = self.ensure_bedside_note(parent).await?;
		let mut content = match note.structured.take() {
			Some(StructuredContent::Bedside(content)) => content,
			None => BedsideContent::default(),
		};

		content.recent_discoveries.push(format!("{}: {}", child.label(), summary_line(new_text)));

		if content.recent_discoveries.len() > ROLLUP_HISTORY_LIMIT {
			let excess = content.recent_discoveries.len() - ROLLUP_HISTORY_LIMIT;

			content.recent_discoveries.drain(..excess);
		}

		note.structured = Some(StructuredContent::Bedside(content));
		note.updated_at = Some(notes::next_timestamp(note.updated_at));

		self.store.put(Collection::Notes, note.to_document()?).await?;

		Ok(())
	}
}

fn summary_line(text: &str) -> String {
	let first = facts::split_sentences(text)
		.into_iter()
		.next()
		.unwrap_or_else(|| text.trim().to_string());

	if first.chars().count() <= ROLLUP_LINE_MAX_CHARS {
		return first;
	}

	let truncated: String = first.chars().take(ROLLUP_LINE_MAX_CHARS).collect();

	format!("{truncated}…")
}
