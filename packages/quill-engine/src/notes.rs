use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, MemoryService, Result};
use quill_domain::embedding;
use quill_store::{
	models::{Note, NoteScope, NoteType, StructuredContent},
	store::{Collection, FieldEq},
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateNote {
	pub scope: NoteScope,
	pub project_id: Option<String>,
	#[serde(default)]
	pub arc_id: Option<String>,
	#[serde(default)]
	pub chapter_id: Option<String>,
	#[serde(rename = "type")]
	pub note_type: NoteType,
	pub text: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default = "default_importance")]
	pub importance: f32,
	#[serde(default)]
	pub structured: Option<StructuredContent>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UpdateNote {
	pub text: Option<String>,
	pub tags: Option<Vec<String>>,
	pub importance: Option<f32>,
	#[serde(rename = "type")]
	pub note_type: Option<NoteType>,
	pub scope: Option<NoteScope>,
	pub project_id: Option<String>,
	pub structured: Option<StructuredContent>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NoteFilter {
	pub scope: Option<NoteScope>,
	pub project_id: Option<String>,
	#[serde(rename = "type")]
	pub note_type: Option<NoteType>,
	/// AND semantics: every listed tag must be present.
	pub tags: Option<Vec<String>>,
	pub min_importance: Option<f32>,
	pub limit: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSort {
	#[default]
	UpdatedAt,
	CreatedAt,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConsolidationScan {
	pub sort_by: ScanSort,
	pub max_importance: Option<f32>,
	pub min_age_days: Option<i64>,
	pub limit: usize,
	pub offset: usize,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SearchByTags {
	pub project_id: Option<String>,
	pub limit: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct DuplicateCheck {
	pub is_duplicate: bool,
	pub best_score: f32,
	pub best_match: Option<Note>,
}

/// One item of a bulk observation capture.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ObservationInput {
	pub text: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default = "default_importance")]
	pub importance: f32,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BulkCreateOutcome {
	pub created: Vec<Note>,
	pub errors: Vec<String>,
}

fn default_importance() -> f32 {
	0.5
}

impl MemoryService {
	pub async fn create_note(&self, input: CreateNote) -> Result<Note> {
		let text = input.text.trim().to_string();

		if text.is_empty() {
			return Err(Error::Validation { message: "Note text must be non-empty.".to_string() });
		}

		let project_id = normalize_project(input.scope, input.project_id)?;
		let embedding = self.embed_text(&text).await?;
		let note = Note {
			note_id: Uuid::new_v4(),
			scope: input.scope,
			project_id,
			arc_id: input.arc_id,
			chapter_id: input.chapter_id,
			note_type: input.note_type,
			text,
			tags: normalize_tags(input.tags),
			importance: input.importance.clamp(0.0, 1.0),
			created_at: OffsetDateTime::now_utc(),
			updated_at: None,
			embedding: Some(embedding),
			bedside: false,
			superseded: false,
			chain: None,
			structured: input.structured,
		};

		self.store.add(Collection::Notes, note.to_document()?).await?;

		Ok(note)
	}

	pub async fn get_note(&self, note_id: Uuid) -> Result<Note> {
		let Some(document) = self.store.get(Collection::Notes, note_id).await? else {
			return Err(Error::NotFound { message: format!("Unknown note {note_id}.") });
		};

		Ok(Note::from_document(&document)?)
	}

	/// Merges only the supplied fields; everything omitted is preserved.
	/// `updated_at` strictly increases even under clock ties.
	pub async fn update_note(&self, note_id: Uuid, partial: UpdateNote) -> Result<Note> {
		let mut note = self.get_note(note_id).await?;
		let text_changed = partial.text.as_ref().is_some_and(|text| text.trim() != note.text);

		if let Some(text) = partial.text {
			let trimmed = text.trim().to_string();

			if trimmed.is_empty() {
				return Err(Error::Validation {
					message: "Note text must be non-empty.".to_string(),
				});
			}

			note.text = trimmed;
		}
		if let Some(tags) = partial.tags {
			note.tags = normalize_tags(tags);
		}
		if let Some(importance) = partial.importance {
			note.importance = importance.clamp(0.0, 1.0);
		}
		if let Some(note_type) = partial.note_type {
			note.note_type = note_type;
		}
		if let Some(scope) = partial.scope {
			note.scope = scope;
		}
		if let Some(project_id) = partial.project_id {
			note.project_id = Some(project_id);
		}
		if let Some(structured) = partial.structured {
			note.structured = Some(structured);
		}

		note.project_id = normalize_project(note.scope, note.project_id.take())?;

		if text_changed {
			note.embedding = Some(self.embed_text(&note.text).await?);
		}

		note.updated_at = Some(next_timestamp(note.updated_at));

		self.store.put(Collection::Notes, note.to_document()?).await?;

		Ok(note)
	}

	pub async fn delete_note(&self, note_id: Uuid) -> Result<()> {
		if !self.store.delete(Collection::Notes, note_id).await? {
			return Err(Error::NotFound { message: format!("Unknown note {note_id}.") });
		}

		Ok(())
	}

	/// Importance-descending, then newest-first; the limit applies after
	/// the sort.
	pub async fn list_notes(&self, filter: NoteFilter) -> Result<Vec<Note>> {
		let mut pushdown = Vec::new();

		if let Some(scope) = filter.scope {
			pushdown.push(FieldEq::new("scope", scope.as_str()));
		}
		if let Some(project_id) = filter.project_id.as_deref() {
			pushdown.push(FieldEq::new("project_id", project_id));
		}
		if let Some(note_type) = filter.note_type {
			pushdown.push(FieldEq::new("type", note_type.as_str()));
		}

		let documents = self.store.scan(Collection::Notes, &pushdown).await?;
		let mut notes = Vec::with_capacity(documents.len());

		for document in &documents {
			notes.push(Note::from_document(document)?);
		}

		if let Some(tags) = filter.tags.as_ref() {
			notes.retain(|note| tags.iter().all(|tag| note.tags.contains(tag)));
		}
		if let Some(min_importance) = filter.min_importance {
			notes.retain(|note| note.importance >= min_importance);
		}

		notes.sort_by(|a, b| {
			b.importance
				.total_cmp(&a.importance)
				.then_with(|| b.created_at.cmp(&a.created_at))
		});

		if let Some(limit) = filter.limit {
			notes.truncate(limit);
		}

		Ok(notes)
	}

	/// Oldest-first over the chosen timestamp, so repeated batches reach
	/// every aged note instead of cycling over the most recent page.
	pub async fn list_for_consolidation(
		&self,
		project_id: &str,
		scan: ConsolidationScan,
	) -> Result<Vec<Note>> {
		let now = OffsetDateTime::now_utc();
		let filters = [
			FieldEq::new("scope", NoteScope::Project.as_str()),
			FieldEq::new("project_id", project_id),
		];
		let documents = self.store.scan(Collection::Notes, &filters).await?;
		let mut notes = Vec::with_capacity(documents.len());

		for document in &documents {
			notes.push(Note::from_document(document)?);
		}

		let sort_key = |note: &Note| match scan.sort_by {
			ScanSort::UpdatedAt => note.last_touched(),
			ScanSort::CreatedAt => note.created_at,
		};

		if let Some(max_importance) = scan.max_importance {
			notes.retain(|note| note.importance <= max_importance);
		}
		if let Some(min_age_days) = scan.min_age_days {
			notes.retain(|note| now - sort_key(note) >= Duration::days(min_age_days));
		}

		notes.sort_by_key(sort_key);

		Ok(notes.into_iter().skip(scan.offset).take(scan.limit).collect())
	}

	/// OR semantics across tags. Author-scope notes are always eligible,
	/// regardless of the project filter.
	pub async fn search_by_tags(&self, tags: &[String], opts: SearchByTags) -> Result<Vec<Note>> {
		let documents = self.store.scan_tags(Collection::Notes, tags).await?;
		let mut notes = Vec::with_capacity(documents.len());

		for document in &documents {
			notes.push(Note::from_document(document)?);
		}

		if let Some(project_id) = opts.project_id.as_deref() {
			notes.retain(|note| {
				note.scope == NoteScope::Author
					|| note.project_id.as_deref() == Some(project_id)
			});
		}

		notes.sort_by(|a, b| {
			b.importance
				.total_cmp(&a.importance)
				.then_with(|| b.created_at.cmp(&a.created_at))
		});

		if let Some(limit) = opts.limit {
			notes.truncate(limit);
		}

		Ok(notes)
	}

	/// Batch observation capture, the write path for extracted facts and
	/// trigger output. Items are validated and written independently;
	/// failures land in `errors` and never abort the batch.
	pub async fn create_observations(
		&self,
		project_id: &str,
		observations: Vec<ObservationInput>,
	) -> BulkCreateOutcome {
		let mut outcome = BulkCreateOutcome::default();

		for observation in observations {
			let input = CreateNote {
				scope: NoteScope::Project,
				project_id: Some(project_id.to_string()),
				arc_id: None,
				chapter_id: None,
				note_type: NoteType::Observation,
				text: observation.text,
				tags: observation.tags,
				importance: observation.importance,
				structured: None,
			};

			match self.create_note(input).await {
				Ok(note) => outcome.created.push(note),
				Err(err) => outcome.errors.push(err.to_string()),
			}
		}

		outcome
	}

	/// Blended lexical/entity/tag similarity against existing notes of the
	/// project (author-scope notes included). Used as a cheap guard before
	/// the agent persists a "remember this".
	pub async fn check_duplicate(
		&self,
		project_id: Option<&str>,
		text: &str,
		tags: &[String],
	) -> Result<DuplicateCheck> {
		let mut candidates = Vec::new();

		if let Some(project_id) = project_id {
			candidates.extend(
				self.list_notes(NoteFilter {
					scope: Some(NoteScope::Project),
					project_id: Some(project_id.to_string()),
					..Default::default()
				})
				.await?,
			);
		}

		candidates.extend(
			self.list_notes(NoteFilter { scope: Some(NoteScope::Author), ..Default::default() })
				.await?,
		);

		let weights = &self.cfg.similarity;
		let dim = self.cfg.memory.embedding_dim as usize;
		let mut best_score = 0.0_f32;
		let mut best_match = None;

		for candidate in candidates {
			if candidate.superseded {
				continue;
			}

			let score = embedding::blended_similarity(
				weights,
				dim,
				text,
				tags,
				&candidate.text,
				&candidate.tags,
				candidate.embedding.as_deref(),
			);

			if score > best_score {
				best_score = score;
				best_match = Some(candidate);
			}
		}

		Ok(DuplicateCheck {
			is_duplicate: best_score >= self.cfg.memory.duplicate_threshold,
			best_score,
			best_match,
		})
	}
}

pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(tags.len());

	for tag in tags {
		let trimmed = tag.trim().to_string();

		if trimmed.is_empty() || out.contains(&trimmed) {
			continue;
		}

		out.push(trimmed);
	}

	out
}

pub(crate) fn normalize_project(
	scope: NoteScope,
	project_id: Option<String>,
) -> Result<Option<String>> {
	let project_id = project_id.map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

	if scope == NoteScope::Project && project_id.is_none() {
		return Err(Error::Validation {
			message: "Project-scoped notes require a project_id.".to_string(),
		});
	}

	Ok(project_id)
}

pub(crate) fn next_timestamp(previous: Option<OffsetDateTime>) -> OffsetDateTime {
	let now = OffsetDateTime::now_utc();

	match previous {
		Some(previous) if now <= previous => previous + Duration::nanoseconds(1),
		_ => now,
	}
}
