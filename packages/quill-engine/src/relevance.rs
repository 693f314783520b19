use crate::{MemoryService, Result, cache::ContextCache, notes::NoteFilter};
use quill_domain::relevance::{self, RelevanceSignals};
use quill_store::models::{Goal, Note, NoteScope, WatchedEntity};

#[derive(Clone, Debug)]
pub struct ScoredNote {
	pub note: Note,
	pub score: f32,
}

impl MemoryService {
	pub async fn cached_notes(
		&self,
		cache: &ContextCache,
		project_id: &str,
	) -> Result<Vec<Note>> {
		if let Some(notes) = cache.get_notes(project_id) {
			return Ok(notes);
		}

		let notes = self
			.list_notes(NoteFilter {
				scope: Some(NoteScope::Project),
				project_id: Some(project_id.to_string()),
				..Default::default()
			})
			.await?;

		cache.put_notes(project_id, notes.clone());

		Ok(notes)
	}

	pub async fn cached_goals(
		&self,
		cache: &ContextCache,
		project_id: &str,
	) -> Result<Vec<Goal>> {
		if let Some(goals) = cache.get_goals(project_id) {
			return Ok(goals);
		}

		let goals = self.list_goals(project_id, None).await?;

		cache.put_goals(project_id, goals.clone());

		Ok(goals)
	}

	pub async fn cached_entities(
		&self,
		cache: &ContextCache,
		project_id: &str,
	) -> Result<Vec<WatchedEntity>> {
		if let Some(entities) = cache.get_entities(project_id) {
			return Ok(entities);
		}

		let entities = self.list_watched_entities(project_id).await?;

		cache.put_entities(project_id, entities.clone());

		Ok(entities)
	}

	/// Ranks the project's notes for prompt-context inclusion. With no
	/// signals the ranking falls back to importance then recency.
	/// Superseded chain versions never enter the context window.
	pub async fn relevant_context(
		&self,
		cache: &ContextCache,
		project_id: &str,
		signals: &RelevanceSignals,
	) -> Result<Vec<ScoredNote>> {
		let notes = self.cached_notes(cache, project_id).await?;
		let weights = &self.cfg.relevance;
		let mut scored: Vec<ScoredNote> = notes
			.into_iter()
			.filter(|note| !note.superseded)
			.map(|note| {
				let score = if signals.is_empty() {
					note.importance
				} else {
					relevance::score_note(weights, &note.text, &note.tags, note.importance, signals)
				};

				ScoredNote { note, score }
			})
			.collect();

		scored.sort_by(|a, b| {
			b.score
				.total_cmp(&a.score)
				.then_with(|| b.note.last_touched().cmp(&a.note.last_touched()))
		});
		scored.truncate(self.cfg.relevance.max_results as usize);

		Ok(scored)
	}
}
