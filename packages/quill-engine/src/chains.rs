use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MemoryService, Result, notes};
use quill_store::{
	models::{ChainLink, ChangeType, Note, StructuredContent},
	store::{Collection, FieldEq},
};

const SUPERSEDE_IMPORTANCE_DROP: f32 = 0.3;
const SUPERSEDE_IMPORTANCE_FLOOR: f32 = 0.1;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EvolveOptions {
	pub change_type: ChangeType,
	pub change_reason: Option<String>,
	pub keep_original: bool,
	pub structured: Option<StructuredContent>,
}

impl Default for EvolveOptions {
	fn default() -> Self {
		Self { change_type: ChangeType::Update, change_reason: None, keep_original: true, structured: None }
	}
}

impl MemoryService {
	/// Appends a new version to the note's chain, anchoring a chain-less
	/// note as version 1 first. The original is never deleted; with
	/// `keep_original = false` it is flagged superseded and its importance
	/// drops by 0.3 (floor 0.1).
	pub async fn evolve_note(
		&self,
		note_id: Uuid,
		new_text: &str,
		options: EvolveOptions,
	) -> Result<Note> {
		let new_text = new_text.trim().to_string();

		if new_text.is_empty() {
			return Err(Error::Validation { message: "Note text must be non-empty.".to_string() });
		}

		let mut original = self.get_note(note_id).await?;
		let link = match original.chain.clone() {
			Some(link) => link,
			None => {
				let link = ChainLink {
					chain_id: Uuid::new_v4(),
					version: 1,
					change_type: ChangeType::Initial,
					change_reason: None,
					supersedes: None,
				};

				original.chain = Some(link.clone());

				link
			},
		};

		let inherited_importance = original.importance;

		if !options.keep_original {
			original.importance = (original.importance - SUPERSEDE_IMPORTANCE_DROP)
				.max(SUPERSEDE_IMPORTANCE_FLOOR);
			original.superseded = true;
		}

		let embedding = self.embed_text(&new_text).await?;
		let evolved = Note {
			note_id: Uuid::new_v4(),
			scope: original.scope,
			project_id: original.project_id.clone(),
			arc_id: original.arc_id.clone(),
			chapter_id: original.chapter_id.clone(),
			note_type: original.note_type,
			text: new_text,
			tags: original.tags.clone(),
			importance: inherited_importance,
			created_at: OffsetDateTime::now_utc(),
			updated_at: None,
			embedding: Some(embedding),
			// The singleton marker always follows the newest version.
			bedside: original.bedside,
			superseded: false,
			chain: Some(ChainLink {
				chain_id: link.chain_id,
				version: link.version + 1,
				change_type: options.change_type,
				change_reason: options.change_reason,
				supersedes: Some(original.note_id),
			}),
			structured: options.structured.or_else(|| original.structured.clone()),
		};

		original.bedside = false;
		original.updated_at = Some(notes::next_timestamp(original.updated_at));

		self.store.put(Collection::Notes, original.to_document()?).await?;
		self.store.add(Collection::Notes, evolved.to_document()?).await?;

		Ok(evolved)
	}

	/// Resolves `id` as a note id first, then as a chain id. Versions come
	/// back ascending; a chain-less note is its own single-version chain.
	pub async fn get_chain(&self, id: Uuid) -> Result<Vec<Note>> {
		let chain_id = match self.store.get(Collection::Notes, id).await? {
			Some(document) => {
				let note = Note::from_document(&document)?;

				match note.chain.as_ref() {
					Some(link) => link.chain_id,
					None => return Ok(vec![note]),
				}
			},
			None => id,
		};
		let filters = [FieldEq::new("chain_id", chain_id.to_string())];
		let documents = self.store.scan(Collection::Notes, &filters).await?;

		if documents.is_empty() {
			return Err(Error::NotFound { message: format!("Unknown note or chain {id}.") });
		}

		let mut versions = Vec::with_capacity(documents.len());

		for document in &documents {
			versions.push(Note::from_document(document)?);
		}

		versions.sort_by_key(|note| note.chain.as_ref().map(|link| link.version).unwrap_or(0));

		Ok(versions)
	}
}
