use quill_config::Relevance;

/// Context signals gathered by the caller for one editing turn.
#[derive(Clone, Debug, Default)]
pub struct RelevanceSignals {
	pub active_entity_names: Vec<String>,
	pub selection_keywords: Vec<String>,
	pub active_chapter_id: Option<String>,
}

impl RelevanceSignals {
	pub fn is_empty(&self) -> bool {
		self.active_entity_names.is_empty()
			&& self.selection_keywords.is_empty()
			&& self.active_chapter_id.is_none()
	}
}

/// Additive relevance score: chapter-tag hits, entity-tag hits (substring
/// either direction, case-insensitive), keyword hits in the text, plus the
/// raw importance as a tie-breaking base.
pub fn score_note(
	weights: &Relevance,
	text: &str,
	tags: &[String],
	importance: f32,
	signals: &RelevanceSignals,
) -> f32 {
	let mut score = importance;

	if let Some(chapter_id) = signals.active_chapter_id.as_deref() {
		for tag in tags {
			if tag.eq_ignore_ascii_case(chapter_id) {
				score += weights.chapter_tag_weight;
			}
		}
	}

	for entity in &signals.active_entity_names {
		let entity_lowered = entity.to_lowercase();

		for tag in tags {
			let tag_lowered = tag.to_lowercase();

			if tag_lowered.contains(&entity_lowered) || entity_lowered.contains(&tag_lowered) {
				score += weights.entity_tag_weight;
			}
		}
	}

	if !signals.selection_keywords.is_empty() {
		let text_lowered = text.to_lowercase();

		for keyword in &signals.selection_keywords {
			if text_lowered.contains(&keyword.to_lowercase()) {
				score += weights.keyword_weight;
			}
		}
	}

	score
}
