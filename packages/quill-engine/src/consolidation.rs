use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	MemoryService, Result,
	notes::{ConsolidationScan, ScanSort},
};
use quill_domain::text;
use quill_store::{
	models::{Goal, Note, NoteScope},
	store::{Collection, FieldEq},
};

const DECAY_WRITE_EPSILON: f32 = 0.01;
const MERGE_IMPORTANCE_BOOST: f32 = 0.05;
const MERGE_ANNOTATION_JACCARD: f32 = 0.9;

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct DecayOptions {
	pub decay_start_days: i64,
	pub decay_rate_per_day: f32,
	pub archive_threshold: f32,
	pub batch_size: u32,
}

impl DecayOptions {
	pub fn from_config(cfg: &quill_config::Consolidation) -> Self {
		Self {
			decay_start_days: cfg.decay_start_days,
			decay_rate_per_day: cfg.decay_rate_per_day,
			archive_threshold: cfg.archive_threshold,
			batch_size: cfg.batch_size,
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DecayOutcome {
	pub scanned: usize,
	pub decayed: usize,
	pub errors: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MergeCandidate {
	pub first: Uuid,
	pub second: Uuid,
	pub score: f32,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MergeOutcome {
	pub candidates: usize,
	pub merged: usize,
	pub errors: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ArchiveOutcome {
	pub archived: usize,
	pub errors: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ConsolidationReport {
	pub decayed: usize,
	pub merged: usize,
	pub archived: usize,
	pub errors: Vec<String>,
}

/// `total` is exact; everything else comes from a bounded sample and is
/// extrapolated by ratio when `approximate` is set.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct HealthStats {
	pub total: u64,
	pub sampled: usize,
	pub approximate: bool,
	pub average_importance: f32,
	pub stale_notes: u64,
	pub weak_notes: u64,
}

impl MemoryService {
	/// Importance decay over the oldest-updated eligible notes. A
	/// persisted decay write also resets `updated_at`, which restarts the
	/// note's aging clock; kept as-is pending product confirmation.
	pub async fn decay(&self, project_id: &str, options: DecayOptions) -> Result<DecayOutcome> {
		let now = OffsetDateTime::now_utc();
		let notes = self
			.list_for_consolidation(project_id, ConsolidationScan {
				sort_by: ScanSort::UpdatedAt,
				max_importance: None,
				min_age_days: Some(options.decay_start_days),
				limit: options.batch_size as usize,
				offset: 0,
			})
			.await?;
		let mut outcome = DecayOutcome { scanned: notes.len(), ..Default::default() };

		for mut note in notes {
			if note.bedside {
				continue;
			}

			let age_days = (now - note.last_touched()).as_seconds_f32() / 86_400.0;
			let days_beyond_start = (age_days - options.decay_start_days as f32).max(0.0);
			let decayed = (note.importance - options.decay_rate_per_day * days_beyond_start)
				.max(options.archive_threshold);

			if (note.importance - decayed).abs() < DECAY_WRITE_EPSILON {
				continue;
			}

			note.importance = decayed;
			note.updated_at = Some(now);

			match note.to_document() {
				Ok(document) =>
					if let Err(err) = self.store.put(Collection::Notes, document).await {
						outcome.errors.push(format!("decay {}: {err}", note.note_id));
					} else {
						outcome.decayed += 1;
					},
				Err(err) => outcome.errors.push(format!("decay {}: {err}", note.note_id)),
			}
		}

		Ok(outcome)
	}

	/// Inverted tag index pairing: only same-type notes sharing at least
	/// `min_tag_overlap` of the smaller tag set are text-scored, so the
	/// pass never degenerates into an O(n^2) comparison.
	pub async fn find_merge_candidates(&self, project_id: &str) -> Result<Vec<MergeCandidate>> {
		let notes = self.project_notes(project_id).await?;
		let by_id: HashMap<Uuid, &Note> = notes.iter().map(|note| (note.note_id, note)).collect();
		let mut tag_index: HashMap<&str, Vec<Uuid>> = HashMap::new();

		for note in &notes {
			// Superseded versions stay for chain history; the bedside
			// singleton is planning state. Neither is merge material.
			if note.superseded || note.bedside {
				continue;
			}

			for tag in &note.tags {
				tag_index.entry(tag.as_str()).or_default().push(note.note_id);
			}
		}

		let mut seen_pairs = HashSet::new();
		let mut candidates = Vec::new();

		for ids in tag_index.values() {
			for (i, first_id) in ids.iter().enumerate() {
				for second_id in &ids[i + 1..] {
					let pair = if first_id < second_id {
						(*first_id, *second_id)
					} else {
						(*second_id, *first_id)
					};

					if !seen_pairs.insert(pair) {
						continue;
					}

					let (Some(first), Some(second)) = (by_id.get(&pair.0), by_id.get(&pair.1))
					else {
						continue;
					};

					if first.note_type != second.note_type {
						continue;
					}
					if tag_overlap(&first.tags, &second.tags) < self.cfg.consolidation.min_tag_overlap
					{
						continue;
					}

					candidates.push(MergeCandidate {
						first: pair.0,
						second: pair.1,
						score: text::token_jaccard(&first.text, &second.text),
					});
				}
			}
		}

		candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

		Ok(candidates)
	}

	/// Collapses each qualifying pair into its higher-importance side:
	/// tags union, +0.05 importance (cap 1.0), and a `[Merged: …]`
	/// annotation when the texts are not near-identical. A note deleted in
	/// this pass never resurfaces as a surviving side of a later pair.
	pub async fn merge(&self, project_id: &str, threshold: f32) -> Result<MergeOutcome> {
		let candidates = self.find_merge_candidates(project_id).await?;
		let notes = self.project_notes(project_id).await?;
		let mut by_id: HashMap<Uuid, Note> =
			notes.into_iter().map(|note| (note.note_id, note)).collect();
		let mut outcome = MergeOutcome { candidates: candidates.len(), ..Default::default() };
		let mut consumed = HashSet::new();

		for candidate in candidates {
			if candidate.score < threshold {
				break;
			}
			if consumed.contains(&candidate.first) || consumed.contains(&candidate.second) {
				continue;
			}

			let (Some(first), Some(second)) =
				(by_id.get(&candidate.first), by_id.get(&candidate.second))
			else {
				continue;
			};

			let (keep_id, drop_id) = if first.importance >= second.importance {
				(candidate.first, candidate.second)
			} else {
				(candidate.second, candidate.first)
			};
			let Some(dropped) = by_id.remove(&drop_id) else { continue };
			let Some(mut keep) = by_id.remove(&keep_id) else {
				by_id.insert(drop_id, dropped);

				continue;
			};

			for tag in &dropped.tags {
				if !keep.tags.contains(tag) {
					keep.tags.push(tag.clone());
				}
			}

			keep.importance = (keep.importance + MERGE_IMPORTANCE_BOOST).min(1.0);

			if candidate.score < MERGE_ANNOTATION_JACCARD {
				keep.text.push_str(&format!(" [Merged: {}]", dropped.text));
			}

			keep.updated_at = Some(OffsetDateTime::now_utc());

			match self.persist_merge(&mut keep, drop_id).await {
				Ok(()) => {
					consumed.insert(keep_id);
					consumed.insert(drop_id);
					by_id.insert(keep_id, keep);

					outcome.merged += 1;
				},
				Err(err) => {
					outcome.errors.push(format!("merge {keep_id} <- {drop_id}: {err}"));
					by_id.insert(keep_id, keep);
					by_id.insert(drop_id, dropped);
				},
			}
		}

		Ok(outcome)
	}

	/// Deletes notes that are both old and weak: age at or beyond the
	/// decay window and importance at or below the archive threshold.
	pub async fn archive(&self, project_id: &str, options: DecayOptions) -> Result<ArchiveOutcome> {
		let now = OffsetDateTime::now_utc();
		let notes = self.project_notes(project_id).await?;
		let mut outcome = ArchiveOutcome::default();

		for note in notes {
			if note.bedside {
				continue;
			}
			if now - note.last_touched() < Duration::days(options.decay_start_days) {
				continue;
			}
			if note.importance > options.archive_threshold {
				continue;
			}

			if let Err(err) = self.store.delete(Collection::Notes, note.note_id).await {
				outcome.errors.push(format!("archive {}: {err}", note.note_id));
			} else {
				outcome.archived += 1;
			}
		}

		Ok(outcome)
	}

	/// Decay, then merge, then archive, in that fixed order. Per-item
	/// failures land in `errors` and never abort the batch.
	pub async fn run_consolidation(&self, project_id: &str) -> Result<ConsolidationReport> {
		let options = DecayOptions::from_config(&self.cfg.consolidation);
		let mut report = ConsolidationReport::default();

		let decay = self.decay(project_id, options).await?;

		report.decayed = decay.decayed;
		report.errors.extend(decay.errors);

		let merge = self.merge(project_id, self.cfg.consolidation.merge_threshold).await?;

		report.merged = merge.merged;
		report.errors.extend(merge.errors);

		let archive = self.archive(project_id, options).await?;

		report.archived = archive.archived;
		report.errors.extend(archive.errors);

		Ok(report)
	}

	/// Hard-deletes completed and abandoned goals older than the cutoff.
	pub async fn archive_old_goals(
		&self,
		project_id: &str,
		max_age_days: i64,
	) -> Result<ArchiveOutcome> {
		let now = OffsetDateTime::now_utc();
		let filters = [FieldEq::new("project_id", project_id)];
		let documents = self.store.scan(Collection::Goals, &filters).await?;
		let mut outcome = ArchiveOutcome::default();

		for document in &documents {
			let goal = match Goal::from_document(document) {
				Ok(goal) => goal,
				Err(err) => {
					outcome.errors.push(format!("goal {}: {err}", document.id));

					continue;
				},
			};

			if !goal.status.is_closed() {
				continue;
			}
			if now - goal.last_touched() < Duration::days(max_age_days) {
				continue;
			}

			if let Err(err) = self.store.delete(Collection::Goals, goal.goal_id).await {
				outcome.errors.push(format!("goal {}: {err}", goal.goal_id));
			} else {
				outcome.archived += 1;
			}
		}

		Ok(outcome)
	}

	pub async fn health_stats(&self, project_id: &str) -> Result<HealthStats> {
		let filters = [
			FieldEq::new("scope", NoteScope::Project.as_str()),
			FieldEq::new("project_id", project_id),
		];
		let total = self.store.count(Collection::Notes, &filters).await?;
		let limit = self.cfg.consolidation.health_sample_limit as usize;
		let mut notes = self.project_notes(project_id).await?;

		notes.truncate(limit);

		let sampled = notes.len();

		if sampled == 0 {
			return Ok(HealthStats { total, ..Default::default() });
		}

		let now = OffsetDateTime::now_utc();
		let stale_window = Duration::days(self.cfg.consolidation.decay_start_days);
		let mut importance_sum = 0.0_f32;
		let mut stale = 0_u64;
		let mut weak = 0_u64;

		for note in &notes {
			importance_sum += note.importance;

			if now - note.last_touched() >= stale_window {
				stale += 1;
			}
			if note.importance <= self.cfg.consolidation.archive_threshold {
				weak += 1;
			}
		}

		let approximate = (sampled as u64) < total;
		let scale = if approximate { total as f32 / sampled as f32 } else { 1.0 };

		Ok(HealthStats {
			total,
			sampled,
			approximate,
			average_importance: importance_sum / sampled as f32,
			stale_notes: (stale as f32 * scale).round() as u64,
			weak_notes: (weak as f32 * scale).round() as u64,
		})
	}

	async fn persist_merge(&self, keep: &mut Note, drop_id: Uuid) -> Result<()> {
		keep.embedding = Some(self.embed_text(&keep.text).await?);

		self.store.put(Collection::Notes, keep.to_document()?).await?;
		self.store.delete(Collection::Notes, drop_id).await?;

		Ok(())
	}

	async fn project_notes(&self, project_id: &str) -> Result<Vec<Note>> {
		let filters = [
			FieldEq::new("scope", NoteScope::Project.as_str()),
			FieldEq::new("project_id", project_id),
		];
		let documents = self.store.scan(Collection::Notes, &filters).await?;
		let mut notes = Vec::with_capacity(documents.len());

		for document in &documents {
			notes.push(Note::from_document(document)?);
		}

		Ok(notes)
	}
}

fn tag_overlap(a: &[String], b: &[String]) -> f32 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
	let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
	let intersection = set_a.intersection(&set_b).count();
	let smaller = set_a.len().min(set_b.len());

	intersection as f32 / smaller as f32
}
